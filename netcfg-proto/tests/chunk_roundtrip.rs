//! Property tests for the chunked JSON transfer

use netcfg_proto::{AccessPoint, ChunkCodec, OperationStatus, Reassembler, ScanResult, decode};
use proptest::prelude::*;

fn arb_access_point() -> impl Strategy<Value = AccessPoint> {
    (".{0,40}", 0u8..=100, prop_oneof![Just(""), Just("WPA2"), Just("WPA2 WPA3"), Just("WEP")])
        .prop_map(|(ssid, signal, secu)| AccessPoint::new(ssid, signal, secu))
}

fn arb_scan() -> impl Strategy<Value = ScanResult> {
    // whole seconds keep the float exact through text
    (0u32.., proptest::collection::vec(arb_access_point(), 0..60))
        .prop_map(|(ts, aps)| ScanResult::new(f64::from(ts), aps))
}

proptest! {
    /// Concatenated chunks always decode to the value that was encoded,
    /// and no chunk exceeds the configured size.
    #[test]
    fn scan_result_survives_any_chunk_size(scan in arb_scan(), size in 1usize..=512) {
        let codec = ChunkCodec::new(size).unwrap();
        let chunks = codec.encode(&scan).unwrap();

        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
        prop_assert_eq!(decode::<ScanResult>(&chunks.concat()).unwrap(), scan);
    }

    /// A status with arbitrary error text (multi-byte characters included)
    /// completes on exactly the last chunk.
    #[test]
    fn status_completes_only_on_the_last_chunk(err in "\\PC{0,200}", size in 1usize..=64) {
        let status = OperationStatus::failed("apply", "wifi_connect_done", err);
        let chunks = ChunkCodec::new(size).unwrap().encode(&status).unwrap();

        let mut reassembler = Reassembler::<OperationStatus>::new();
        reassembler.subscribe();
        let (last, init) = chunks.split_last().unwrap();
        for chunk in init {
            prop_assert!(reassembler.push(chunk).is_none());
        }
        prop_assert_eq!(reassembler.push(last), Some(status));
    }
}
