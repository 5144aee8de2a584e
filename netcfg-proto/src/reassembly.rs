//! Client-side reassembly of chunked notifications
//!
//! ```text
//! Idle --subscribe--> Subscribed --chunk--> Accumulating --parse ok--> Complete
//!                                                |
//!                                                +--deadline--> TimedOut
//! ```
//!
//! Every chunk is appended and a full parse is attempted. A payload that never
//! parses is indistinguishable from one that is still arriving; the caller's
//! deadline decides, after which it falls back to a direct read.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::chunk::decode;

/// Upper bound on buffered bytes before the buffer is discarded.
pub const DEFAULT_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyState {
    Idle,
    Subscribed,
    Accumulating,
    Complete,
    TimedOut,
}

pub struct Reassembler<T> {
    state: ReassemblyState,
    buffer: Vec<u8>,
    limit: usize,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Default for Reassembler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Reassembler<T> {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: ReassemblyState::Idle,
            buffer: Vec::new(),
            limit,
            _payload: PhantomData,
        }
    }

    pub fn state(&self) -> ReassemblyState {
        self.state
    }

    /// Bytes accumulated for the payload in progress
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Notifications are enabled; start a fresh payload.
    pub fn subscribe(&mut self) {
        self.buffer.clear();
        self.state = ReassemblyState::Subscribed;
    }

    /// Feed one notification. Returns the value once the buffer parses.
    ///
    /// After `Complete` the next chunk starts a new payload, so one
    /// reassembler can follow a stream of values. Chunks arriving after a
    /// timeout are ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Option<T> {
        match self.state {
            ReassemblyState::TimedOut => return None,
            ReassemblyState::Idle | ReassemblyState::Complete => self.subscribe(),
            ReassemblyState::Subscribed | ReassemblyState::Accumulating => {}
        }

        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > self.limit {
            self.subscribe();
            return None;
        }

        match decode(&self.buffer) {
            Ok(value) => {
                self.buffer.clear();
                self.state = ReassemblyState::Complete;
                Some(value)
            }
            Err(_) => {
                self.state = ReassemblyState::Accumulating;
                None
            }
        }
    }

    /// The deadline fired before a payload completed.
    pub fn time_out(&mut self) {
        if self.state != ReassemblyState::Complete {
            self.buffer.clear();
            self.state = ReassemblyState::TimedOut;
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ReassemblyState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkCodec;
    use crate::status::OperationStatus;

    #[test]
    fn completes_on_the_last_chunk() {
        let status = OperationStatus::failed("apply", "wifi_connect_done", "x".repeat(100));
        let chunks = ChunkCodec::new(16).unwrap().encode(&status).unwrap();

        let mut r = Reassembler::<OperationStatus>::new();
        assert_eq!(r.state(), ReassemblyState::Idle);
        r.subscribe();
        assert_eq!(r.state(), ReassemblyState::Subscribed);

        let (last, init) = chunks.split_last().unwrap();
        for chunk in init {
            assert!(r.push(chunk).is_none());
            assert_eq!(r.state(), ReassemblyState::Accumulating);
        }
        assert_eq!(r.push(last), Some(status));
        assert_eq!(r.state(), ReassemblyState::Complete);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn follows_consecutive_payloads() {
        let mut r = Reassembler::<OperationStatus>::new();
        r.subscribe();
        let a = OperationStatus::succeeded("wifi_scan", "start");
        let b = OperationStatus::succeeded("wifi_scan", "done");
        assert_eq!(r.push(&serde_json::to_vec(&a).unwrap()), Some(a));
        assert_eq!(r.push(&serde_json::to_vec(&b).unwrap()), Some(b));
    }

    #[test]
    fn late_chunks_after_timeout_are_ignored() {
        let mut r = Reassembler::<OperationStatus>::new();
        r.subscribe();
        assert!(r.push(b"{\"op\":").is_none());
        r.time_out();
        assert_eq!(r.state(), ReassemblyState::TimedOut);
        assert_eq!(r.buffered(), 0);
        assert!(r.push(br#"{"op":"a","stage":"b","ok":true,"err":null}"#).is_none());
        assert_eq!(r.state(), ReassemblyState::TimedOut);
    }

    #[test]
    fn reset_reuses_a_timed_out_reassembler() {
        let mut r = Reassembler::<OperationStatus>::new();
        r.subscribe();
        assert!(r.push(b"{\"op\":").is_none());
        r.time_out();

        r.reset();
        assert_eq!(r.state(), ReassemblyState::Idle);
        assert_eq!(r.buffered(), 0);
        let status = OperationStatus::succeeded("apply", "done");
        assert_eq!(r.push(&serde_json::to_vec(&status).unwrap()), Some(status));
    }

    #[test]
    fn oversized_garbage_is_discarded() {
        let mut r = Reassembler::<OperationStatus>::with_limit(8);
        r.subscribe();
        assert!(r.push(b"garbage-garbage").is_none());
        assert_eq!(r.buffered(), 0);
        assert_eq!(r.state(), ReassemblyState::Subscribed);
    }
}
