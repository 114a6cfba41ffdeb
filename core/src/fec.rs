//! Reed-Solomon forward error correction for the three UAT code
//! configurations, wrapped so callers see decoded data plus a
//! corrected-byte count or a plain "uncorrectable".

use reed_solomon::{Decoder, Encoder};

use crate::{
    ADSB_LONG_BYTES, ADSB_LONG_DATA, ADSB_SHORT_BYTES, ADSB_SHORT_DATA, FISB_BLOCK_BYTES,
    FISB_BLOCK_DATA,
};

/// Parity lengths: RS(92,72), RS(48,34), RS(30,18).
pub const FISB_PARITY: usize = FISB_BLOCK_BYTES - FISB_BLOCK_DATA; // 20
pub const ADSB_LONG_PARITY: usize = ADSB_LONG_BYTES - ADSB_LONG_DATA; // 14
pub const ADSB_SHORT_PARITY: usize = ADSB_SHORT_BYTES - ADSB_SHORT_DATA; // 12

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    /// One FIS-B uplink block, corrects up to 10 byte errors.
    FisbBlock,
    /// ADS-B long payload, corrects up to 7.
    AdsbLong,
    /// ADS-B short payload, corrects up to 6.
    AdsbShort,
}

impl Code {
    pub fn data_bytes(self) -> usize {
        match self {
            Code::FisbBlock => FISB_BLOCK_DATA,
            Code::AdsbLong => ADSB_LONG_DATA,
            Code::AdsbShort => ADSB_SHORT_DATA,
        }
    }

    pub fn parity_bytes(self) -> usize {
        match self {
            Code::FisbBlock => FISB_PARITY,
            Code::AdsbLong => ADSB_LONG_PARITY,
            Code::AdsbShort => ADSB_SHORT_PARITY,
        }
    }

    pub fn total_bytes(self) -> usize {
        self.data_bytes() + self.parity_bytes()
    }
}

pub struct FecDecoder {
    fisb: Decoder,
    adsb_long: Decoder,
    adsb_short: Decoder,
}

impl FecDecoder {
    pub fn new() -> Self {
        Self {
            fisb: Decoder::new(FISB_PARITY),
            adsb_long: Decoder::new(ADSB_LONG_PARITY),
            adsb_short: Decoder::new(ADSB_SHORT_PARITY),
        }
    }

    /// Attempt to correct one codeword. Returns the data bytes and the
    /// number of codeword bytes that were corrected, or `None` when the
    /// error count exceeds the code's capability.
    pub fn decode(&self, code: Code, codeword: &[u8]) -> Option<(Vec<u8>, usize)> {
        debug_assert_eq!(codeword.len(), code.total_bytes());
        let decoder = match code {
            Code::FisbBlock => &self.fisb,
            Code::AdsbLong => &self.adsb_long,
            Code::AdsbShort => &self.adsb_short,
        };
        match decoder.correct(codeword, None) {
            Ok(buffer) => {
                let corrected = codeword
                    .iter()
                    .zip(buffer.iter())
                    .filter(|(a, b)| a != b)
                    .count();
                Some((buffer.data().to_vec(), corrected))
            }
            Err(_) => None,
        }
    }
}

impl Default for FecDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encoder counterpart, used by the synthetic-transmission generator and
/// the test suite.
pub struct FecEncoder {
    fisb: Encoder,
    adsb_long: Encoder,
    adsb_short: Encoder,
}

impl FecEncoder {
    pub fn new() -> Self {
        Self {
            fisb: Encoder::new(FISB_PARITY),
            adsb_long: Encoder::new(ADSB_LONG_PARITY),
            adsb_short: Encoder::new(ADSB_SHORT_PARITY),
        }
    }

    /// Encode data into a full codeword (data followed by parity).
    pub fn encode(&self, code: Code, data: &[u8]) -> Vec<u8> {
        debug_assert_eq!(data.len(), code.data_bytes());
        let encoder = match code {
            Code::FisbBlock => &self.fisb,
            Code::AdsbLong => &self.adsb_long,
            Code::AdsbShort => &self.adsb_short,
        };
        encoder.encode(data)[..].to_vec()
    }
}

impl Default for FecEncoder {
    fn default() -> Self {
        Self::new()
    }
}
