//! Corrector output lines.
//!
//! One decoded packet per line:
//! `<P><hex>;rs=<syncE>/<blockErrors>;ss=<level>/<rssi>;t=<epoch>.<ms>`
//! and, when enabled, `#FAILED-...` comment lines carrying the original
//! frame header for archival.

use std::fmt::Write;

use crate::corrector::{BlockErrors, Decoded, Failure};
use crate::frame::FrameHeader;

/// Full-scale power reference for RSSI: i16 full scale squared. The value
/// and the resulting dB offset are kept identical to the legacy tool so
/// downstream consumers see comparable numbers.
pub const RSSI_FULL_SCALE: f64 = 32768.0 * 32768.0;

/// `10*log10(power)` with the legacy full-scale offset. The mean |slice|
/// is already a power quantity (each slice sample is a product of two
/// amplitudes).
pub fn rssi_db(mean_abs: f64) -> f64 {
    10.0 * (mean_abs.max(1.0) / RSSI_FULL_SCALE).log10()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputStyle {
    #[default]
    Full,
    /// Legacy decoder compatibility: hex, RSSI and time only.
    Compat,
}

pub fn success_line(decoded: &Decoded, style: OutputStyle) -> String {
    let h = &decoded.header;
    match style {
        OutputStyle::Full => format!(
            "{}{};rs={}/{};ss={:.2}/{:.1};t={}.{:03}",
            h.packet_type.sign(),
            hex(&decoded.payload),
            h.sync_errors,
            block_errors_field(&decoded.block_errors),
            h.level as f64 / 1e6,
            decoded.rssi,
            h.secs,
            h.millis(),
        ),
        OutputStyle::Compat => format!(
            "{}{};rssi={:.1};t={}.{:03};",
            h.packet_type.sign(),
            hex(&decoded.payload),
            decoded.rssi,
            h.secs,
            h.millis(),
        ),
    }
}

pub fn failure_line(failure: &Failure) -> String {
    let h = &failure.header;
    format!(
        "#FAILED-{} rs={}/{};ss={:.2}/{:.1};t={}.{:03};hdr={}",
        h.packet_type.label(),
        h.sync_errors,
        block_errors_field(&failure.block_errors),
        h.level as f64 / 1e6,
        failure.rssi,
        h.secs,
        h.millis(),
        header_text(h),
    )
}

fn header_text(header: &FrameHeader) -> String {
    let raw = header.encode();
    String::from_utf8_lossy(&raw).trim_end().to_string()
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn block_errors_field(errors: &BlockErrors) -> String {
    match errors {
        BlockErrors::Fisb(blocks) => {
            let mut out = String::with_capacity(blocks.len() * 3);
            for (i, e) in blocks.iter().enumerate() {
                if i > 0 {
                    out.push(':');
                }
                let _ = write!(out, "{e:02}");
            }
            out
        }
        BlockErrors::Adsb(e) => e.to_string(),
    }
}
