//! End-to-end pipeline scenarios: synthetic IQ in, demodulated packet
//! frames through the corrector, formatted output lines out.

use std::fmt::Write as _;

use uat978_core::fec::Code;
use uat978_core::synth::{self, word_bits, Modulator};
use uat978_core::{
    output, Corrector, CorrectorConfig, DemodConfig, Demodulator, FecEncoder, Outcome,
    OutputStyle, PacketClock, PacketFrame, ADSB_SYNC_WORD, FISB_BLOCKS, FISB_BLOCK_BYTES,
    FISB_MESSAGE_BYTES, FISB_SYNC_WORD, SYNC_BITS,
};

fn demodulate(bytes: &[u8]) -> Vec<PacketFrame> {
    let mut demod = Demodulator::new(DemodConfig::default(), PacketClock::replay());
    let mut frames = Vec::new();
    demod.refill();
    demod
        .process(bytes, |frame| {
            frames.push(frame);
            Ok(())
        })
        .unwrap();
    frames
}

fn transmission(sync: u64, payload: &[bool]) -> Vec<u8> {
    let mut modulator = Modulator::new(6000.0);
    let mut bytes = modulator.idle_bits(60);
    bytes.extend(modulator.bits(&word_bits(sync, SYNC_BITS)));
    bytes.extend(modulator.bits(payload));
    bytes.extend(modulator.idle_bits(8));
    bytes
}

fn decode_lines(bytes: &[u8]) -> Vec<String> {
    let _ = env_logger::builder().is_test(true).try_init();
    let corrector = Corrector::new(CorrectorConfig::default());
    demodulate(bytes)
        .iter()
        .filter_map(|frame| match corrector.correct(&frame.header, &frame.samples) {
            Outcome::Decoded(decoded) => {
                Some(output::success_line(&decoded, OutputStyle::Full))
            }
            Outcome::Failed(failure) => Some(output::failure_line(&failure)),
        })
        .collect()
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::new();
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Uplink message with a recognizable station header and an information
/// frame long enough to span all six blocks.
fn long_message() -> Vec<u8> {
    let mut message = vec![0u8; FISB_MESSAGE_BYTES];
    message[..8].copy_from_slice(&[0x38, 0xf1, 0x81, 0x85, 0x53, 0x4c, 0x00, 0x10]);
    message[8] = (400usize >> 1) as u8;
    message[9] = ((400 & 1) << 7) as u8;
    for (i, byte) in message.iter_mut().enumerate().skip(10).take(400) {
        *byte = (i * 13 + 7) as u8;
    }
    message
}

#[test]
fn test_clean_fisb_end_to_end() {
    let message = long_message();
    let bytes = transmission(FISB_SYNC_WORD, &synth::fisb_payload_bits(&message));
    let lines = decode_lines(&bytes);
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with(&format!("+{}", hex(&message))), "{line}");
    assert!(line.contains(";rs=0/00:00:00:00:00:00;"), "{line}");
    assert!(line.contains(";t=0.000"), "{line}");
    // 432 payload bytes as hex, plus the metadata fields
    assert_eq!(line.matches(';').count(), 3);
}

#[test]
fn test_clean_adsb_long_end_to_end() {
    let mut data = [0u8; 34];
    data[0] = 0x08;
    for (i, byte) in data.iter_mut().enumerate().skip(1) {
        *byte = (i * 3 + 1) as u8;
    }
    let bytes = transmission(ADSB_SYNC_WORD, &synth::adsb_long_bits(&data));
    let lines = decode_lines(&bytes);
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with(&format!("-{}", hex(&data))), "{line}");
    assert_eq!(line.find(';').unwrap(), 1 + 68); // 34 bytes of hex
    assert!(line.contains(";rs=0/0;"), "{line}");
}

#[test]
fn test_clean_adsb_short_end_to_end() {
    let mut data = [0u8; 18];
    data[0] = 0x02; // type 0: short payload
    for (i, byte) in data.iter_mut().enumerate().skip(1) {
        *byte = (i * 5 + 3) as u8;
    }
    let bytes = transmission(ADSB_SYNC_WORD, &synth::adsb_short_bits(&data));
    let lines = decode_lines(&bytes);
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with(&format!("-{}", hex(&data))), "{line}");
    assert_eq!(line.find(';').unwrap(), 1 + 36); // 18 bytes of hex
    assert!(line.contains(";rs=0/0;"), "{line}");
}

#[test]
fn test_corrupted_block_corrected_end_to_end() {
    let message = long_message();
    let enc = FecEncoder::new();
    let mut blocks = [[0u8; FISB_BLOCK_BYTES]; FISB_BLOCKS];
    for (i, block) in blocks.iter_mut().enumerate() {
        block.copy_from_slice(&enc.encode(Code::FisbBlock, &message[i * 72..(i + 1) * 72]));
    }
    blocks[2][4] ^= 0xff;
    blocks[2][50] ^= 0x42;
    let bytes = transmission(FISB_SYNC_WORD, &synth::fisb_payload_bits_raw(&blocks));
    let lines = decode_lines(&bytes);
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with(&format!("+{}", hex(&message))), "{line}");
    assert!(line.contains(";rs=0/00:00:02:00:00:00;"), "{line}");
}

#[test]
fn test_empty_fisb_shortcut_end_to_end() {
    let mut message = vec![0u8; FISB_MESSAGE_BYTES];
    message[..8].copy_from_slice(&[0x38, 0xf1, 0x81, 0x85, 0x53, 0x4c, 0x00, 0x10]);
    let enc = FecEncoder::new();
    let mut blocks = [[0u8; FISB_BLOCK_BYTES]; FISB_BLOCKS];
    blocks[0].copy_from_slice(&enc.encode(Code::FisbBlock, &message[..72]));
    for (i, block) in blocks.iter_mut().enumerate().skip(1) {
        for (j, byte) in block.iter_mut().enumerate() {
            *byte = (i * 91 + j * 37 + 11) as u8;
        }
    }
    let bytes = transmission(FISB_SYNC_WORD, &synth::fisb_payload_bits_raw(&blocks));
    let lines = decode_lines(&bytes);
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with(&format!("+{}", hex(&message))), "{line}");
    assert!(line.contains(";rs=0/00:99:99:99:99:99;"), "{line}");
}

#[test]
fn test_below_gate_produces_nothing() {
    let message = long_message();
    let mut modulator = Modulator::new(500.0);
    let mut bytes = modulator.idle_bits(60);
    bytes.extend(modulator.bits(&word_bits(FISB_SYNC_WORD, SYNC_BITS)));
    bytes.extend(modulator.bits(&synth::fisb_payload_bits(&message)));
    bytes.extend(modulator.idle_bits(8));
    assert!(decode_lines(&bytes).is_empty());
}

#[test]
fn test_uncorrectable_packet_reports_failure_line() {
    let message = long_message();
    let enc = FecEncoder::new();
    let mut blocks = [[0u8; FISB_BLOCK_BYTES]; FISB_BLOCKS];
    for (i, block) in blocks.iter_mut().enumerate() {
        block.copy_from_slice(&enc.encode(Code::FisbBlock, &message[i * 72..(i + 1) * 72]));
    }
    for i in 0..20 {
        blocks[4][i * 4 + 1] ^= 0xc3;
    }
    let bytes = transmission(FISB_SYNC_WORD, &synth::fisb_payload_bits_raw(&blocks));
    let lines = decode_lines(&bytes);
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with("#FAILED-FIS-B "), "{line}");
    assert!(line.contains("/00:00:00:00:98:00;"), "{line}");
    assert!(line.contains(";hdr=0000000000.000000.F."), "{line}");
}

#[test]
fn test_back_to_back_packets_keep_order() {
    let mut modulator = Modulator::new(6000.0);
    let mut data = [0u8; 34];
    data[0] = 0x08;
    let message = long_message();

    let mut bytes = modulator.idle_bits(60);
    bytes.extend(modulator.bits(&word_bits(ADSB_SYNC_WORD, SYNC_BITS)));
    bytes.extend(modulator.bits(&synth::adsb_long_bits(&data)));
    bytes.extend(modulator.idle_bits(40));
    bytes.extend(modulator.bits(&word_bits(FISB_SYNC_WORD, SYNC_BITS)));
    bytes.extend(modulator.bits(&synth::fisb_payload_bits(&message)));
    bytes.extend(modulator.idle_bits(8));

    let lines = decode_lines(&bytes);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('-'));
    assert!(lines[1].starts_with('+'));
    assert!(lines[0].contains(";t=0.000"));
    assert!(lines[1].contains(";t=0.001"));
}
