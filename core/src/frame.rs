//! Inter-component packet framing: the fixed-width metadata header that
//! precedes every packet sample frame on the demodulator/corrector pipe.

use crate::error::{Result, UatError};
use crate::{
    ADSB_FRAME_SAMPLES, ADSB_PAYLOAD_BITS, ADSB_SYNC_WORD, FISB_FRAME_SAMPLES, FISB_PAYLOAD_BITS,
    FISB_SYNC_WORD, HEADER_LEN, MAX_HEADER_LEVEL, MAX_SYNC_ERRORS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    Fisb,
    Adsb,
}

impl PacketType {
    pub fn type_byte(self) -> char {
        match self {
            PacketType::Fisb => 'F',
            PacketType::Adsb => 'A',
        }
    }

    pub fn from_type_byte(c: char) -> Result<Self> {
        match c {
            'F' => Ok(PacketType::Fisb),
            'A' => Ok(PacketType::Adsb),
            other => Err(UatError::UnknownPacketType(other)),
        }
    }

    pub fn sync_word(self) -> u64 {
        match self {
            PacketType::Fisb => FISB_SYNC_WORD,
            PacketType::Adsb => ADSB_SYNC_WORD,
        }
    }

    /// Payload length in bits following the sync word.
    pub fn payload_bits(self) -> usize {
        match self {
            PacketType::Fisb => FISB_PAYLOAD_BITS,
            PacketType::Adsb => ADSB_PAYLOAD_BITS,
        }
    }

    /// Samples in the packet frame: one leading sample, two per payload
    /// bit, two trailing samples for the one-sample-later retry window.
    pub fn frame_samples(self) -> usize {
        match self {
            PacketType::Fisb => FISB_FRAME_SAMPLES,
            PacketType::Adsb => ADSB_FRAME_SAMPLES,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PacketType::Fisb => "FIS-B",
            PacketType::Adsb => "ADS-B",
        }
    }

    /// Leading character of a decoded output line.
    pub fn sign(self) -> char {
        match self {
            PacketType::Fisb => '+',
            PacketType::Adsb => '-',
        }
    }
}

/// Arrival metadata for one packet sample frame.
///
/// Encodes as exactly 36 ASCII bytes: `SSSSSSSSSS.UUUUUU.T.LLLLLLLL.E`
/// (epoch seconds, microseconds, type byte, clamped signal level, sync-bit
/// error count), right-padded with spaces to the fixed width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub secs: u64,
    pub micros: u32,
    pub packet_type: PacketType,
    /// 72-sample running level at the sync match, clamped to 8 digits.
    pub level: i64,
    /// Sync-word bit errors, 0..=4.
    pub sync_errors: u8,
}

impl FrameHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let text = format!(
            "{:010}.{:06}.{}.{:08}.{}",
            self.secs,
            self.micros,
            self.packet_type.type_byte(),
            self.level.clamp(0, MAX_HEADER_LEVEL),
            self.sync_errors,
        );
        let mut raw = [b' '; HEADER_LEN];
        raw[..text.len()].copy_from_slice(text.as_bytes());
        raw
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() != HEADER_LEN {
            return Err(UatError::MalformedHeader(format!(
                "length {} != {}",
                raw.len(),
                HEADER_LEN
            )));
        }
        let text = std::str::from_utf8(raw)
            .map_err(|_| UatError::MalformedHeader("not ASCII".into()))?;
        let body = text.trim_end_matches(' ');
        let mut fields = body.split('.');
        let secs = parse_field(fields.next(), 10, "seconds")?;
        let micros = parse_field(fields.next(), 6, "microseconds")? as u32;
        let type_field = fields
            .next()
            .ok_or_else(|| UatError::MalformedHeader("missing type".into()))?;
        let mut type_chars = type_field.chars();
        let packet_type = match (type_chars.next(), type_chars.next()) {
            (Some(c), None) => PacketType::from_type_byte(c)?,
            _ => return Err(UatError::MalformedHeader("bad type field".into())),
        };
        let level = parse_field(fields.next(), 8, "level")? as i64;
        let sync_errors = parse_field(fields.next(), 1, "sync errors")? as u8;
        if fields.next().is_some() {
            return Err(UatError::MalformedHeader("trailing fields".into()));
        }

        if micros >= 1_000_000 {
            return Err(UatError::MalformedHeader("microseconds >= 1000000".into()));
        }
        if u32::from(sync_errors) > MAX_SYNC_ERRORS {
            return Err(UatError::MalformedHeader("sync errors > 4".into()));
        }
        Ok(FrameHeader {
            secs,
            micros,
            packet_type,
            level,
            sync_errors,
        })
    }

    /// Millisecond fraction used by output lines and capture filenames.
    pub fn millis(&self) -> u32 {
        self.micros / 1000
    }
}

fn parse_field(field: Option<&str>, width: usize, name: &str) -> Result<u64> {
    let field =
        field.ok_or_else(|| UatError::MalformedHeader(format!("missing {name} field")))?;
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UatError::MalformedHeader(format!("bad {name} field")));
    }
    field
        .parse()
        .map_err(|_| UatError::MalformedHeader(format!("bad {name} field")))
}
