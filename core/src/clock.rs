//! Packet arrival timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{NANOS_PER_SAMPLE, SYNC_SAMPLES};

/// Clock source for packet metadata.
///
/// Live capture stamps wall-clock time at every input-buffer refill and
/// offsets by the sample position; file replay substitutes a synthetic
/// monotonic counter whose millisecond field wraps at 1000, so capture
/// files written during replay keep sortable names.
#[derive(Clone, Debug)]
pub enum PacketClock {
    Wall { secs: u64, micros: u32 },
    Replay { packets: u64 },
}

impl PacketClock {
    pub fn wall() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        PacketClock::Wall {
            secs: now.as_secs(),
            micros: now.subsec_micros(),
        }
    }

    pub fn replay() -> Self {
        PacketClock::Replay { packets: 0 }
    }

    /// Re-stamp at an input-buffer refill. No-op for replay.
    pub fn refill(&mut self) {
        if let PacketClock::Wall { secs, micros } = self {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            *secs = now.as_secs();
            *micros = now.subsec_micros();
        }
    }

    /// Arrival time of a packet whose sync word ends at the given sample
    /// index within the current buffer. The reported time refers to the
    /// start of the sync word, one sync duration earlier; microsecond
    /// over- and underflow roll into the seconds field.
    pub fn packet_time(&mut self, sample_index: u64) -> (u64, u32) {
        match self {
            PacketClock::Wall { secs, micros } => {
                let offset_ns =
                    (sample_index as i64 - SYNC_SAMPLES as i64) * NANOS_PER_SAMPLE;
                let total_us =
                    *secs as i64 * 1_000_000 + i64::from(*micros) + offset_ns / 1000;
                let total_us = total_us.max(0);
                ((total_us / 1_000_000) as u64, (total_us % 1_000_000) as u32)
            }
            PacketClock::Replay { packets } => {
                let n = *packets;
                *packets += 1;
                (n / 1000, (n % 1000) as u32 * 1000)
            }
        }
    }
}
