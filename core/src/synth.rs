//! Synthetic UAT transmissions: continuous-phase FSK at two samples per
//! bit, emitted as the CS16 little-endian stream the demodulator ingests.
//! This is the signal source for the test suites and for generating replay
//! files; there is no transmit path in the live pipeline.

use std::f64::consts::FRAC_PI_4;

use crate::fec::{Code, FecEncoder};
use crate::interleave::interleave;
use crate::{
    ADSB_PAYLOAD_BITS, FISB_BLOCKS, FISB_BLOCK_BYTES, FISB_BLOCK_DATA, FISB_MESSAGE_BYTES,
};

/// Carrier phase accumulator. Each bit advances the phase by +-pi/4 per
/// sample, so the two-sample differential the demodulator computes has the
/// bit's sign on every nominal slice sample.
pub struct Modulator {
    phase: f64,
    amplitude: f64,
}

impl Modulator {
    pub fn new(amplitude: f64) -> Self {
        Self {
            phase: 0.0,
            amplitude,
        }
    }

    /// Modulate bits, two samples each, as little-endian IQ pairs.
    pub fn bits(&mut self, bits: &[bool]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bits.len() * 8);
        for &bit in bits {
            let step = if bit { FRAC_PI_4 } else { -FRAC_PI_4 };
            for _ in 0..2 {
                self.phase += step;
                let i = (self.amplitude * self.phase.cos()).round() as i16;
                let q = (self.amplitude * self.phase.sin()).round() as i16;
                out.extend_from_slice(&i.to_le_bytes());
                out.extend_from_slice(&q.to_le_bytes());
            }
        }
        out
    }

    /// Alternating warm-up bits, enough to prime the demodulator's energy
    /// window ahead of a sync word.
    pub fn idle_bits(&mut self, count: usize) -> Vec<u8> {
        let bits: Vec<bool> = (0..count).map(|i| i % 2 == 0).collect();
        self.bits(&bits)
    }

    /// Dead air.
    pub fn silence(&mut self, samples: usize) -> Vec<u8> {
        vec![0u8; samples * 4]
    }
}

/// Word bits MSB first, as transmitted.
pub fn word_bits(word: u64, bits: usize) -> Vec<bool> {
    (0..bits).rev().map(|b| word >> b & 1 == 1).collect()
}

/// Byte bits MSB first, as transmitted.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |b| byte >> b & 1 == 1))
        .collect()
}

/// Interleaved FIS-B payload bits for a 432-byte uplink message: each
/// 72-byte block is RS-encoded to 92 bytes, the six codewords are
/// byte-interleaved, and the 552 bytes transmit MSB first.
pub fn fisb_payload_bits(message: &[u8]) -> Vec<bool> {
    assert_eq!(message.len(), FISB_MESSAGE_BYTES);
    let enc = FecEncoder::new();
    let mut blocks = [[0u8; FISB_BLOCK_BYTES]; FISB_BLOCKS];
    for (i, block) in blocks.iter_mut().enumerate() {
        let data = &message[i * FISB_BLOCK_DATA..(i + 1) * FISB_BLOCK_DATA];
        block.copy_from_slice(&enc.encode(Code::FisbBlock, data));
    }
    bytes_to_bits(&interleave(&blocks))
}

/// FIS-B payload bits with caller-supplied raw codewords, for exercising
/// corrupted or unencoded blocks.
pub fn fisb_payload_bits_raw(blocks: &[[u8; FISB_BLOCK_BYTES]; FISB_BLOCKS]) -> Vec<bool> {
    bytes_to_bits(&interleave(blocks))
}

/// ADS-B long payload bits: RS(48,34) codeword, 384 bits.
pub fn adsb_long_bits(data: &[u8]) -> Vec<bool> {
    let enc = FecEncoder::new();
    bytes_to_bits(&enc.encode(Code::AdsbLong, data))
}

/// ADS-B short payload bits: RS(30,18) codeword in the 240-bit prefix,
/// zero filler to the full 384-bit frame.
pub fn adsb_short_bits(data: &[u8]) -> Vec<bool> {
    let enc = FecEncoder::new();
    let mut bits = bytes_to_bits(&enc.encode(Code::AdsbShort, data));
    bits.resize(ADSB_PAYLOAD_BITS, false);
    bits
}
