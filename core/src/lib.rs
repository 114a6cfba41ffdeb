//! 978 MHz UAT demodulation and error correction
//!
//! Recovers FIS-B ground uplinks and ADS-B transmissions from a raw CS16
//! IQ stream. Decode yield on marginal signals is improved by a slice-shift
//! search that retries Reed-Solomon over re-sliced bit streams instead of
//! trusting the two-samples-per-bit slice point.

pub mod clock;
pub mod corrector;
pub mod demod;
pub mod error;
pub mod fec;
pub mod frame;
pub mod interleave;
pub mod output;
pub mod schedule;
pub mod slicing;
pub mod synth;
pub mod uplink;

pub use clock::PacketClock;
pub use corrector::{BlockErrors, Corrector, CorrectorConfig, Decoded, Failure, Outcome};
pub use demod::{DemodConfig, Demodulator, PacketFrame};
pub use error::{Result, UatError};
pub use fec::{Code, FecDecoder, FecEncoder};
pub use frame::{FrameHeader, PacketType};
pub use output::OutputStyle;
pub use schedule::{Direction, ShiftSchedule, SliceStep};

// Input stream configuration
pub const SAMPLE_RATE: usize = 2_083_334;
pub const SAMPLES_PER_BIT: usize = 2;
/// Duration of one sample in nanoseconds (1 / 2,083,334 s).
pub const NANOS_PER_SAMPLE: i64 = 480;

// Sync words (36 bits; the ADS-B word is the bitwise complement of FIS-B)
pub const SYNC_BITS: usize = 36;
pub const SYNC_SAMPLES: usize = SYNC_BITS * SAMPLES_PER_BIT; // 72
pub const SYNC_WORD_MASK: u64 = (1 << SYNC_BITS) - 1;
pub const FISB_SYNC_WORD: u64 = 0x153225B1D;
pub const ADSB_SYNC_WORD: u64 = 0xEACDDA4E2;
/// Maximum Hamming distance for a sync-word match.
pub const MAX_SYNC_ERRORS: u32 = 4;

// FIS-B uplink: 6 interleaved RS(92,72) blocks
pub const FISB_PAYLOAD_BITS: usize = 4416;
pub const FISB_FRAME_SAMPLES: usize = 2 * FISB_PAYLOAD_BITS + 3; // 8835
pub const FISB_INTERLEAVED_BYTES: usize = FISB_PAYLOAD_BITS / 8; // 552
pub const FISB_BLOCKS: usize = 6;
pub const FISB_BLOCK_BYTES: usize = 92;
pub const FISB_BLOCK_DATA: usize = 72;
pub const FISB_MESSAGE_BYTES: usize = FISB_BLOCKS * FISB_BLOCK_DATA; // 432

// ADS-B: one RS block, long RS(48,34) or short RS(30,18)
pub const ADSB_PAYLOAD_BITS: usize = 384;
pub const ADSB_FRAME_SAMPLES: usize = 2 * ADSB_PAYLOAD_BITS + 3; // 771
pub const ADSB_LONG_BYTES: usize = 48;
pub const ADSB_LONG_DATA: usize = 34;
pub const ADSB_SHORT_BYTES: usize = 30;
pub const ADSB_SHORT_DATA: usize = 18;

// Inter-component framing
pub const HEADER_LEN: usize = 36;
pub const MAX_HEADER_LEVEL: i64 = 99_999_999;

/// Default sync gate: minimum 72-sample running level for sync search.
pub const DEFAULT_GATE_LEVEL: i64 = 900_000;

// Per-block error-count sentinels
pub const BLOCK_FAILED: u8 = 98;
pub const BLOCK_NOT_ATTEMPTED: u8 = 99;
