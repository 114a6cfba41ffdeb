//! Packet error correction: Reed-Solomon over re-sliced bit streams with
//! the slice-shift search, the FIS-B block pipeline and its repair
//! heuristics, and the ADS-B short/long decision.

use log::debug;

use crate::fec::{Code, FecDecoder};
use crate::frame::{FrameHeader, PacketType};
use crate::output;
use crate::schedule::{ShiftSchedule, SliceStep};
use crate::slicing::FrameSamples;
use crate::uplink;
use crate::{
    ADSB_SHORT_BYTES, ADSB_SHORT_DATA, BLOCK_FAILED, BLOCK_NOT_ATTEMPTED, FISB_BLOCKS,
    FISB_BLOCK_BYTES, FISB_BLOCK_DATA, FISB_MESSAGE_BYTES,
};

#[derive(Clone, Debug)]
pub struct CorrectorConfig {
    pub schedule: ShiftSchedule,
    /// Block-zero fixed-bit repair (reserved uplink header bits).
    pub fixed_bit_repair: bool,
    /// Trailing near-zero re-slice on failing blocks.
    pub tail_repair: bool,
    /// Candidate ground-station first-six-byte overlays.
    pub first_six: Vec<[u8; 6]>,
    /// Accept overlay-assisted decodes without re-checking that the
    /// decoded prefix still equals the candidate.
    pub trust_overlays: bool,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            schedule: ShiftSchedule::default(),
            fixed_bit_repair: true,
            tail_repair: true,
            first_six: Vec::new(),
            trust_overlays: false,
        }
    }
}

/// Per-block corrected-byte counts; 98 marks a block that failed every
/// strategy, 99 one that was never attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockErrors {
    Fisb([u8; FISB_BLOCKS]),
    Adsb(u8),
}

#[derive(Clone, Debug)]
pub struct Decoded {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
    pub block_errors: BlockErrors,
    pub rssi: f64,
}

#[derive(Clone, Debug)]
pub struct Failure {
    pub header: FrameHeader,
    pub block_errors: BlockErrors,
    pub rssi: f64,
}

pub enum Outcome {
    Decoded(Decoded),
    Failed(Failure),
}

struct BlockDecode {
    data: Vec<u8>,
    corrected: usize,
    /// Schedule index that succeeded, the starting hint for the next block.
    step: usize,
}

pub struct Corrector {
    cfg: CorrectorConfig,
    fec: FecDecoder,
}

impl Corrector {
    pub fn new(cfg: CorrectorConfig) -> Self {
        Self {
            cfg,
            fec: FecDecoder::new(),
        }
    }

    pub fn correct(&self, header: &FrameHeader, samples: &[i32]) -> Outcome {
        let view = FrameSamples::new(samples, header.packet_type.payload_bits());
        let rssi = output::rssi_db(view.mean_abs());
        match header.packet_type {
            PacketType::Fisb => self.correct_fisb(header, &view, rssi),
            PacketType::Adsb => self.correct_adsb(header, &view, rssi),
        }
    }

    fn correct_fisb(&self, header: &FrameHeader, view: &FrameSamples<'_>, rssi: f64) -> Outcome {
        let mut payload = vec![0u8; FISB_MESSAGE_BYTES];
        let mut errors = [BLOCK_FAILED; FISB_BLOCKS];
        let mut hint = 0;
        let mut failed = false;
        for block in 0..FISB_BLOCKS {
            match self.decode_fisb_block(view, block, hint) {
                Some(decode) => {
                    errors[block] = decode.corrected as u8;
                    hint = decode.step;
                    payload[block * FISB_BLOCK_DATA..(block + 1) * FISB_BLOCK_DATA]
                        .copy_from_slice(&decode.data);
                    if block == 0 && uplink::ends_in_block_zero(&decode.data) {
                        // short message: the rest of the payload is zero
                        // padding and blocks 1..5 are never attempted
                        for e in &mut errors[1..] {
                            *e = BLOCK_NOT_ATTEMPTED;
                        }
                        debug!("uplink message ends in block 0");
                        break;
                    }
                }
                None => {
                    errors[block] = BLOCK_FAILED;
                    failed = true;
                }
            }
        }
        let block_errors = BlockErrors::Fisb(errors);
        if failed {
            Outcome::Failed(Failure {
                header: *header,
                block_errors,
                rssi,
            })
        } else {
            Outcome::Decoded(Decoded {
                header: *header,
                payload,
                block_errors,
                rssi,
            })
        }
    }

    fn decode_fisb_block(
        &self,
        view: &FrameSamples<'_>,
        block: usize,
        hint: usize,
    ) -> Option<BlockDecode> {
        // schedule search over the nominal window, then one sample later
        for offset in 0..=1 {
            for idx in hint_first(self.cfg.schedule.len(), hint) {
                let step = self.cfg.schedule.steps()[idx];
                let codeword = block_codeword(view, offset, step, block);
                if let Some((data, corrected)) = self.fec.decode(Code::FisbBlock, &codeword) {
                    return Some(BlockDecode {
                        data,
                        corrected,
                        step: idx,
                    });
                }
            }
        }
        if self.cfg.tail_repair {
            if let Some(decode) = self.tail_repair(view, block) {
                return Some(decode);
            }
        }
        if block == 0 && self.cfg.fixed_bit_repair {
            if let Some(decode) = self.fixed_bit_repair(view) {
                return Some(decode);
            }
        }
        None
    }

    /// A transmission that faded out leaves the block tail sliced from
    /// noise around the receiver's DC level. Re-slice a trailing run of
    /// near-zero samples against the block's zero average before one more
    /// attempt.
    fn tail_repair(&self, view: &FrameSamples<'_>, block: usize) -> Option<BlockDecode> {
        let bit_count = FISB_BLOCK_BYTES * 8;
        let values: Vec<i64> = (0..bit_count)
            .map(|i| i64::from(view.current(0, block_bit(block, i))))
            .collect();
        let mean_abs = values.iter().map(|v| v.abs()).sum::<i64>() / bit_count as i64;
        let threshold = mean_abs / 4;
        let run = values
            .iter()
            .rev()
            .take_while(|v| v.abs() < threshold)
            .count();
        if run < 8 {
            return None;
        }
        let near_zero: Vec<i64> = values
            .iter()
            .copied()
            .filter(|v| v.abs() < threshold)
            .collect();
        let zero_avg = near_zero.iter().sum::<i64>() / near_zero.len() as i64;

        let mut codeword = block_codeword(view, 0, SliceStep::Center, block);
        for i in bit_count - run..bit_count {
            set_bit(&mut codeword, i, values[i] >= zero_avg);
        }
        let (data, corrected) = self.fec.decode(Code::FisbBlock, &codeword)?;
        debug!("block {block} recovered by tail repair over {run} bits");
        Some(BlockDecode {
            data,
            corrected,
            step: 0,
        })
    }

    /// Block zero opens with the uplink header, whose reserved bits are
    /// known constants; force them, then try each configured
    /// ground-station prefix overlay.
    fn fixed_bit_repair(&self, view: &FrameSamples<'_>) -> Option<BlockDecode> {
        let mut codeword = block_codeword(view, 0, SliceStep::Center, 0);
        uplink::apply_fixed_bits(&mut codeword);
        if let Some((data, corrected)) = self.fec.decode(Code::FisbBlock, &codeword) {
            debug!("block 0 recovered by fixed-bit repair");
            return Some(BlockDecode {
                data,
                corrected,
                step: 0,
            });
        }
        for candidate in &self.cfg.first_six {
            let mut overlaid = codeword;
            overlaid[..6].copy_from_slice(candidate);
            if let Some((data, corrected)) = self.fec.decode(Code::FisbBlock, &overlaid) {
                if self.cfg.trust_overlays || data[..6] == candidate[..] {
                    debug!("block 0 recovered by station overlay {candidate:02x?}");
                    return Some(BlockDecode {
                        data,
                        corrected,
                        step: 0,
                    });
                }
                debug!("station overlay {candidate:02x?} decoded but moved the prefix, rejected");
            }
        }
        None
    }

    fn correct_adsb(&self, header: &FrameHeader, view: &FrameSamples<'_>, rssi: f64) -> Outcome {
        for offset in 0..=1 {
            for &step in self.cfg.schedule.steps() {
                let bytes = view.bytes(offset, step);
                if let Some((data, corrected)) =
                    self.fec.decode(Code::AdsbShort, &bytes[..ADSB_SHORT_BYTES])
                {
                    // short payloads identify themselves by a zero type
                    if data[0] >> 3 == 0 {
                        return self.adsb_decoded(header, data, corrected, rssi);
                    }
                }
                if let Some((mut data, corrected)) = self.fec.decode(Code::AdsbLong, &bytes) {
                    if data[0] >> 3 == 0 {
                        // a long decode claiming the short type keeps only
                        // the short payload
                        data.truncate(ADSB_SHORT_DATA);
                    }
                    return self.adsb_decoded(header, data, corrected, rssi);
                }
            }
        }
        Outcome::Failed(Failure {
            header: *header,
            block_errors: BlockErrors::Adsb(BLOCK_FAILED),
            rssi,
        })
    }

    fn adsb_decoded(
        &self,
        header: &FrameHeader,
        payload: Vec<u8>,
        corrected: usize,
        rssi: f64,
    ) -> Outcome {
        Outcome::Decoded(Decoded {
            header: *header,
            payload,
            block_errors: BlockErrors::Adsb(corrected as u8),
            rssi,
        })
    }
}

/// Try the hinted schedule index first, then the rest in order.
fn hint_first(len: usize, hint: usize) -> impl Iterator<Item = usize> {
    std::iter::once(hint).chain((0..len).filter(move |&i| i != hint))
}

/// Payload bit index of bit `i` of the given block: interleaved byte
/// `6*j + block` carries block byte `j`.
fn block_bit(block: usize, i: usize) -> usize {
    (FISB_BLOCKS * (i / 8) + block) * 8 + i % 8
}

fn block_codeword(
    view: &FrameSamples<'_>,
    offset: usize,
    step: SliceStep,
    block: usize,
) -> [u8; FISB_BLOCK_BYTES] {
    let mut codeword = [0u8; FISB_BLOCK_BYTES];
    for (j, byte) in codeword.iter_mut().enumerate() {
        let base = (FISB_BLOCKS * j + block) * 8;
        let mut b = 0u8;
        for bit in 0..8 {
            b = (b << 1) | u8::from(view.bit(offset, step, base + bit));
        }
        *byte = b;
    }
    codeword
}

fn set_bit(codeword: &mut [u8], i: usize, value: bool) {
    let mask = 1 << (7 - i % 8);
    if value {
        codeword[i / 8] |= mask;
    } else {
        codeword[i / 8] &= !mask;
    }
}
