//! Corruption self-check for the frame codec.
//!
//! Encodes a batch of synthetic frames, flips one byte in a random subset of
//! them, and decodes everything again. The report says how many corrupted
//! frames the checksum caught. With CRC-32 and single-byte damage the answer
//! is always "all of them"; the check exists to demonstrate that on a live
//! build, not to measure anything subtle.

use rand::Rng;

use crate::{FrameCodec, FrameType};

/// Outcome of [`simulate_corruption`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorruptionReport {
    /// Frames encoded.
    pub sent: usize,
    /// Frames that had a byte flipped before decoding.
    pub corrupted: usize,
    /// Frames that failed to decode.
    pub detected: usize,
}

impl CorruptionReport {
    /// Corrupted frames that decoded anyway.
    pub fn undetected(&self) -> usize {
        self.corrupted.saturating_sub(self.detected)
    }

    /// Share of corrupted frames that were caught, in `0.0..=1.0`.
    ///
    /// `1.0` when nothing was corrupted.
    pub fn detection_rate(&self) -> f64 {
        if self.corrupted == 0 {
            return 1.0;
        }
        self.detected as f64 / self.corrupted as f64
    }
}

/// Runs the corruption self-check.
///
/// Each of `frames` synthetic frames is corrupted with probability
/// `error_rate` (clamped to `0.0..=1.0`) by XOR-ing one random byte with
/// `0xFF`.
pub fn simulate_corruption<R: Rng + ?Sized>(
    codec: &FrameCodec,
    rng: &mut R,
    frames: usize,
    error_rate: f64,
) -> CorruptionReport {
    let error_rate = if error_rate.is_nan() {
        0.0
    } else {
        error_rate.clamp(0.0, 1.0)
    };
    let mut report = CorruptionReport::default();

    for i in 0..frames {
        let text = format!("Test packet {i}");
        let Ok(mut bytes) =
            codec.encode_text(i as u16, FrameType::Game, &text)
        else {
            continue;
        };
        report.sent += 1;

        if rng.random_bool(error_rate) {
            let index = rng.random_range(0..bytes.len());
            bytes[index] ^= 0xFF;
            report.corrupted += 1;
        }

        if codec.decode(&bytes).is_err() {
            report.detected += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_simulate_corruption_zero_rate_corrupts_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        let report =
            simulate_corruption(&FrameCodec::default(), &mut rng, 50, 0.0);

        assert_eq!(report.sent, 50);
        assert_eq!(report.corrupted, 0);
        assert_eq!(report.detected, 0);
        assert_eq!(report.detection_rate(), 1.0);
    }

    #[test]
    fn test_simulate_corruption_full_rate_detects_every_flip() {
        let mut rng = StdRng::seed_from_u64(11);
        let report =
            simulate_corruption(&FrameCodec::default(), &mut rng, 200, 1.0);

        assert_eq!(report.corrupted, 200);
        assert_eq!(report.detected, 200);
        assert_eq!(report.undetected(), 0);
    }

    #[test]
    fn test_simulate_corruption_out_of_range_rate_is_clamped() {
        let mut rng = StdRng::seed_from_u64(3);
        let report =
            simulate_corruption(&FrameCodec::plain(), &mut rng, 10, 5.0);
        assert_eq!(report.corrupted, 10);

        let report =
            simulate_corruption(&FrameCodec::plain(), &mut rng, 10, f64::NAN);
        assert_eq!(report.corrupted, 0);
    }
}
