//! FM-style differential demodulation of the 978 MHz CS16 sample stream,
//! with gated dual-phase sync-word search and packet frame emission.

use log::debug;

use crate::clock::PacketClock;
use crate::error::Result;
use crate::frame::{FrameHeader, PacketType};
use crate::{
    DEFAULT_GATE_LEVEL, MAX_HEADER_LEVEL, MAX_SYNC_ERRORS, SYNC_SAMPLES, SYNC_WORD_MASK,
};

#[derive(Clone, Debug)]
pub struct DemodConfig {
    /// Minimum 72-sample running level for the sync search to run.
    pub gate_level: i64,
    pub decode_fisb: bool,
    pub decode_adsb: bool,
}

impl Default for DemodConfig {
    fn default() -> Self {
        Self {
            gate_level: DEFAULT_GATE_LEVEL,
            decode_fisb: true,
            decode_adsb: true,
        }
    }
}

/// One detected packet: metadata plus its sample frame.
#[derive(Clone, Debug)]
pub struct PacketFrame {
    pub header: FrameHeader,
    pub samples: Vec<i32>,
}

enum State {
    Searching,
    /// A sync fired on the previous sample; the opposite phase gets one
    /// look before the packet commits, and a same-type match with fewer
    /// sync-bit errors steals it.
    Pending {
        packet_type: PacketType,
        errors: u8,
        level: i64,
        index: u64,
    },
    Emitting {
        header: FrameHeader,
        samples: Vec<i32>,
    },
}

/// Owns every piece of demodulator state: the two-sample IQ history, the
/// per-phase sync shift registers, the 72-sample energy window, in-buffer
/// timing, and the per-sample state machine.
pub struct Demodulator {
    cfg: DemodConfig,
    clock: PacketClock,
    i1: i32,
    i2: i32,
    q1: i32,
    q2: i32,
    reg_even: u64,
    reg_odd: u64,
    even: bool,
    window: [i32; SYNC_SAMPLES],
    window_pos: usize,
    window_sum: i64,
    buf_index: u64,
    state: State,
}

impl Demodulator {
    pub fn new(cfg: DemodConfig, clock: PacketClock) -> Self {
        Self {
            cfg,
            clock,
            i1: 0,
            i2: 0,
            q1: 0,
            q2: 0,
            reg_even: 0,
            reg_odd: 0,
            even: true,
            window: [0; SYNC_SAMPLES],
            window_pos: 0,
            window_sum: 0,
            buf_index: 0,
            state: State::Searching,
        }
    }

    /// Mark an input-buffer refill: re-stamp the clock and restart the
    /// in-buffer sample index the arrival-time offset is computed from.
    pub fn refill(&mut self) {
        self.clock.refill();
        self.buf_index = 0;
    }

    /// Demodulate a buffer of little-endian IQ pairs, handing completed
    /// packet frames to `emit`. The caller guarantees whole pairs.
    pub fn process<F>(&mut self, bytes: &[u8], mut emit: F) -> Result<()>
    where
        F: FnMut(PacketFrame) -> Result<()>,
    {
        debug_assert_eq!(bytes.len() % 4, 0);
        for pair in bytes.chunks_exact(4) {
            let i = i16::from_le_bytes([pair[0], pair[1]]);
            let q = i16::from_le_bytes([pair[2], pair[3]]);
            if let Some(frame) = self.feed(i, q) {
                emit(frame)?;
            }
        }
        Ok(())
    }

    /// Feed one IQ pair; returns a packet frame when one completes on
    /// this sample.
    pub fn feed(&mut self, i: i16, q: i16) -> Option<PacketFrame> {
        let s = self.slice_value(i, q);

        self.window_sum += i64::from(s.unsigned_abs()) - i64::from(self.window[self.window_pos].unsigned_abs());
        self.window[self.window_pos] = s;
        self.window_pos = (self.window_pos + 1) % SYNC_SAMPLES;

        let even_phase = self.even;
        self.even = !self.even;
        let reg = if even_phase {
            self.reg_even = (self.reg_even << 1) | u64::from(s > 0);
            self.reg_even
        } else {
            self.reg_odd = (self.reg_odd << 1) | u64::from(s > 0);
            self.reg_odd
        };

        let index = self.buf_index;
        self.buf_index += 1;
        let level = self.window_sum / SYNC_SAMPLES as i64;
        let gate_open = level > self.cfg.gate_level;

        let mut out = None;
        self.state = match std::mem::replace(&mut self.state, State::Searching) {
            State::Searching => {
                if gate_open {
                    if let Some((packet_type, errors)) = self.sync_match(reg) {
                        State::Pending {
                            packet_type,
                            errors,
                            level,
                            index,
                        }
                    } else {
                        State::Searching
                    }
                } else {
                    State::Searching
                }
            }
            State::Pending {
                packet_type,
                errors,
                level: match_level,
                index: match_index,
            } => {
                // One look at the opposite phase: a cleaner same-type
                // match wins the packet and shifts its start here.
                let steal = if gate_open {
                    self.sync_match(reg)
                        .filter(|&(t, e)| t == packet_type && e < errors)
                } else {
                    None
                };
                self.reg_even = 0;
                self.reg_odd = 0;
                match steal {
                    Some((packet_type, errors)) => {
                        let header =
                            self.make_header(packet_type, errors, level, index);
                        State::Emitting {
                            header,
                            samples: Vec::with_capacity(packet_type.frame_samples()),
                        }
                    }
                    None => {
                        let header = self.make_header(
                            packet_type,
                            errors,
                            match_level,
                            match_index,
                        );
                        let mut samples =
                            Vec::with_capacity(packet_type.frame_samples());
                        samples.push(s);
                        State::Emitting { header, samples }
                    }
                }
            }
            State::Emitting { header, mut samples } => {
                samples.push(s);
                if samples.len() == header.packet_type.frame_samples() {
                    debug!(
                        "{} sync at {}.{:06} level {} errors {}",
                        header.packet_type.label(),
                        header.secs,
                        header.micros,
                        header.level,
                        header.sync_errors
                    );
                    out = Some(PacketFrame { header, samples });
                    State::Searching
                } else {
                    State::Emitting { header, samples }
                }
            }
        };
        out
    }

    /// `s[n] = I[n-2]*Q[n] - I[n]*Q[n-2]`, a two-sample differential of
    /// the instantaneous phase. Integer only; the i16*i16 products are
    /// exact in i64 and the difference saturates into i32.
    fn slice_value(&mut self, i: i16, q: i16) -> i32 {
        let (i, q) = (i32::from(i), i32::from(q));
        let s = i64::from(self.i2) * i64::from(q) - i64::from(i) * i64::from(self.q2);
        self.i2 = self.i1;
        self.i1 = i;
        self.q2 = self.q1;
        self.q1 = q;
        s.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    fn sync_match(&self, reg: u64) -> Option<(PacketType, u8)> {
        for packet_type in [PacketType::Fisb, PacketType::Adsb] {
            let enabled = match packet_type {
                PacketType::Fisb => self.cfg.decode_fisb,
                PacketType::Adsb => self.cfg.decode_adsb,
            };
            if !enabled {
                continue;
            }
            let errors = ((reg ^ packet_type.sync_word()) & SYNC_WORD_MASK).count_ones();
            if errors <= MAX_SYNC_ERRORS {
                return Some((packet_type, errors as u8));
            }
        }
        None
    }

    fn make_header(
        &mut self,
        packet_type: PacketType,
        errors: u8,
        level: i64,
        index: u64,
    ) -> FrameHeader {
        let (secs, micros) = self.clock.packet_time(index);
        FrameHeader {
            secs,
            micros,
            packet_type,
            level: level.clamp(0, MAX_HEADER_LEVEL),
            sync_errors: errors,
        }
    }
}
