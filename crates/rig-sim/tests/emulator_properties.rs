//! Property tests for the emulators
//!
//! Replies must not depend on how the host splits its writes.

use std::time::Duration;

use proptest::prelude::*;
use rig_core::Transport;
use rig_sim::{Emulator, SimTransport, VirtualKenwood, VirtualRigConfig, VirtualTenTec};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub fn drain<E: Emulator>(t: &mut SimTransport<E>) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 16];
        while let Ok(n) = t.read(&mut buf, Duration::ZERO) {
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    /// Write `stream` in pieces at the given cut points and collect replies
    pub fn chunked<E: Emulator>(radio: E, stream: &[u8], cuts: &[usize]) -> (Vec<u8>, u64) {
        let mut t = SimTransport::new(radio);
        let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (stream.len() + 1)).collect();
        cuts.sort_unstable();
        let mut start = 0;
        let mut out = Vec::new();
        for cut in cuts.into_iter().chain(std::iter::once(stream.len())) {
            if cut > start {
                t.write(&stream[start..cut]).unwrap();
                out.extend(drain(&mut t));
                start = cut;
            }
        }
        (out, t.handle().frames_received())
    }
}

use helpers::*;

const KENWOOD_SCRIPT: &[u8] = b"FA;FB00007074000;FB;MD3;MD;FR1;IF;ID;PC;XX;";

fn tentec_script() -> Vec<u8> {
    let mut s = b"?A\r?M\r*M33\r?M\r".to_vec();
    s.extend_from_slice(&[b'*', b'A', 0x00, 0x6B, 0x6C, 0x0D, b'\r']);
    s.extend_from_slice(b"?A\r?S\rXX\r");
    s
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_kenwood_split_writes(cuts in proptest::collection::vec(any::<usize>(), 0..12)) {
        let config = VirtualRigConfig::default();
        let (whole, frames) = chunked(VirtualKenwood::new(&config), KENWOOD_SCRIPT, &[]);
        let (pieces, pieces_frames) = chunked(VirtualKenwood::new(&config), KENWOOD_SCRIPT, &cuts);
        prop_assert_eq!(whole, pieces);
        prop_assert_eq!(frames, 10);
        prop_assert_eq!(pieces_frames, 10);
    }

    #[test]
    fn prop_tentec_split_writes(cuts in proptest::collection::vec(any::<usize>(), 0..12)) {
        let config = VirtualRigConfig::default();
        let script = tentec_script();
        let (whole, frames) = chunked(VirtualTenTec::tt588(&config), &script, &[]);
        let (pieces, pieces_frames) = chunked(VirtualTenTec::tt588(&config), &script, &cuts);
        prop_assert_eq!(whole, pieces);
        prop_assert_eq!(frames, 8);
        prop_assert_eq!(pieces_frames, 8);
    }
}
