//! Chunked JSON transfer over MTU-limited notifications
//!
//! A value is serialized to UTF-8 JSON and split into consecutive chunks of at
//! most `chunk_size` bytes. Nothing is added to the stream: no length prefix, no
//! sequence numbers. The receiver concatenates chunks in delivery order and
//! attempts a full parse after each one.
//!
//! ```text
//! {"ts":1700000000.5,"aps":[{"ssid":"Home","sign":82,"secu":"WPA2"},...]}
//! |<------ chunk 1 (<= 360) ------>|<------ chunk 2 ------>|<- chunk 3 ->|
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ble::DEFAULT_CHUNK_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The accumulated bytes do not (yet) form a complete value.
///
/// A prefix of a valid payload and a corrupt payload fail the same way; the
/// caller decides how long to keep accumulating.
#[derive(Debug, thiserror::Error)]
#[error("incomplete payload after {received} bytes: {source}")]
pub struct IncompleteError {
    pub received: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Splits serialized values into bounded chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCodec {
    chunk_size: usize,
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

impl ChunkCodec {
    pub fn new(chunk_size: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroChunkSize);
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Serialize `value` and split it into chunks.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<Vec<u8>>, ChunkError> {
        Ok(self.split(&to_json_bytes(value)?))
    }

    /// Split already-serialized bytes. An empty input yields no chunks.
    pub fn split(&self, bytes: &[u8]) -> Vec<Vec<u8>> {
        bytes.chunks(self.chunk_size).map(<[u8]>::to_vec).collect()
    }
}

/// Serialize a value the way every characteristic carries it.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Parse the accumulated bytes as one complete value.
///
/// Trailing bytes after a complete value are an error too, so a stream is
/// never silently truncated to its first value.
pub fn decode<T: DeserializeOwned>(accumulated: &[u8]) -> Result<T, IncompleteError> {
    serde_json::from_slice(accumulated).map_err(|source| IncompleteError {
        received: accumulated.len(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample() -> Value {
        let aps: Vec<Value> = (0..40)
            .map(|i| json!({"ssid": format!("Network-{i}"), "sign": 50 + i, "secu": "WPA2 WPA3"}))
            .collect();
        json!({"ts": 1_700_000_000.25, "aps": aps})
    }

    #[test]
    fn chunks_respect_the_size_bound() {
        let codec = ChunkCodec::default();
        let size = codec.chunk_size();
        assert_eq!(size, 360);
        let chunks = codec.encode(&sample()).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
        // only the last chunk may be short
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == size));
    }

    #[test]
    fn concatenated_chunks_decode_to_the_original() {
        let codec = ChunkCodec::new(20).unwrap();
        let value = sample();
        let joined: Vec<u8> = codec.encode(&value).unwrap().concat();
        assert_eq!(decode::<Value>(&joined).unwrap(), value);
    }

    #[test]
    fn multibyte_text_survives_splitting_inside_a_character() {
        let codec = ChunkCodec::new(3).unwrap();
        let value = json!({"ssid": "Домашняя сеть ☕"});
        let joined: Vec<u8> = codec.encode(&value).unwrap().concat();
        assert_eq!(decode::<Value>(&joined).unwrap(), value);
    }

    #[test]
    fn every_strict_prefix_is_incomplete() {
        let bytes = to_json_bytes(&sample()).unwrap();
        for end in [0, 1, bytes.len() / 2, bytes.len() - 1] {
            let err = decode::<Value>(&bytes[..end]).unwrap_err();
            assert_eq!(err.received, end);
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = to_json_bytes(&json!({"ok": true})).unwrap();
        bytes.extend_from_slice(b"{\"ok\":");
        assert!(decode::<Value>(&bytes).is_err());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(ChunkCodec::new(0), Err(ChunkError::ZeroChunkSize)));
    }

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(ChunkCodec::default().split(&[]).is_empty());
    }
}
