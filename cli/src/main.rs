use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::AsyncBufReadExt;
use uat978_core::{
    output, Corrector, CorrectorConfig, DemodConfig, Demodulator, FrameHeader, Outcome,
    OutputStyle, PacketClock, PacketFrame, PacketType, Result, ShiftSchedule, UatError,
    HEADER_LEN, SAMPLE_RATE,
};

/// Raw input buffer: 1/10 second of IQ pairs.
const INPUT_BUFFER_BYTES: usize = SAMPLE_RATE / 10 * 4;

#[derive(Parser)]
#[command(name = "uat978")]
#[command(about = "978 MHz UAT demodulator and FIS-B/ADS-B error corrector")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Demodulate raw CS16 IQ on stdin into packet sample frames
    Demod {
        /// Search for FIS-B uplinks only
        #[arg(long, conflicts_with = "adsb_only")]
        fisb_only: bool,

        /// Search for ADS-B transmissions only
        #[arg(long)]
        adsb_only: bool,

        /// Sync gate level in millionths (0.9 means a running level of 900000)
        #[arg(long, default_value = "0.9")]
        level: f64,

        /// Replay-file mode: synthetic monotonic packet timestamps
        #[arg(long)]
        replay: bool,
    },

    /// Error-correct packet frames on stdin into hex payload lines
    Correct {
        /// Decode FIS-B frames only
        #[arg(long, conflicts_with = "adsb_only")]
        fisb_only: bool,

        /// Decode ADS-B frames only
        #[arg(long)]
        adsb_only: bool,

        /// Disable the block-zero fixed-bit repair
        #[arg(long)]
        no_fixed_bits: bool,

        /// Disable trailing-zero repair
        #[arg(long)]
        no_tail_repair: bool,

        /// Candidate ground-station first-six-byte overlay, 12 hex chars (repeatable)
        #[arg(long = "first-six", value_name = "HEX")]
        first_six: Vec<String>,

        /// Accept overlay-assisted decodes without re-verifying the prefix
        #[arg(long)]
        trust_overlays: bool,

        /// Emit a comment line for each uncorrectable FIS-B packet
        #[arg(long)]
        fail_fisb: bool,

        /// Emit a comment line for each uncorrectable ADS-B packet
        #[arg(long)]
        fail_adsb: bool,

        /// Legacy decoder compatible output lines
        #[arg(long)]
        compat: bool,

        /// Write every incoming frame's samples to DIR as <epoch>.<ms>.<type>.i32
        #[arg(long, value_name = "DIR")]
        capture_dir: Option<PathBuf>,

        /// Write failed frames (header plus samples) to DIR for later replay
        #[arg(long, value_name = "DIR")]
        failed_dir: Option<PathBuf>,

        /// Override the slice-shift schedule, e.g. "after:50,before:50,after:30"
        #[arg(long, value_name = "STEPS")]
        schedule: Option<String>,
    },

    /// Broadcast corrector output lines to every connected TCP client
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3333")]
        port: u16,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Demod {
            fisb_only,
            adsb_only,
            level,
            replay,
        } => run_demod(fisb_only, adsb_only, level, replay),
        Commands::Correct {
            fisb_only,
            adsb_only,
            no_fixed_bits,
            no_tail_repair,
            first_six,
            trust_overlays,
            fail_fisb,
            fail_adsb,
            compat,
            capture_dir,
            failed_dir,
            schedule,
        } => run_correct(CorrectOptions {
            fisb_only,
            adsb_only,
            no_fixed_bits,
            no_tail_repair,
            first_six,
            trust_overlays,
            fail_fisb,
            fail_adsb,
            compat,
            capture_dir,
            failed_dir,
            schedule,
        }),
        Commands::Serve { port } => run_serve(port),
    };
    if let Err(err) = result {
        eprintln!("uat978: {err}");
        std::process::exit(1);
    }
}

fn run_demod(fisb_only: bool, adsb_only: bool, level: f64, replay: bool) -> Result<()> {
    if !(0.0..100.0).contains(&level) {
        return Err(UatError::Args(format!("gate level {level} out of range")));
    }
    let cfg = DemodConfig {
        gate_level: (level * 1e6) as i64,
        decode_fisb: !adsb_only,
        decode_adsb: !fisb_only,
    };
    let clock = if replay {
        PacketClock::replay()
    } else {
        PacketClock::wall()
    };
    let mut demod = Demodulator::new(cfg, clock);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut buf = vec![0u8; INPUT_BUFFER_BYTES];

    loop {
        let filled = fill_buffer(&mut input, &mut buf)?;
        if filled == 0 {
            break;
        }
        if filled % 4 != 0 {
            return Err(UatError::TruncatedInput(filled % 4));
        }
        demod.refill();
        demod.process(&buf[..filled], |frame| write_frame(&mut out, &frame))?;
        out.flush()?;
    }
    out.flush()?;
    Ok(())
}

fn write_frame(out: &mut impl Write, frame: &PacketFrame) -> Result<()> {
    out.write_all(&frame.header.encode())?;
    for sample in &frame.samples {
        out.write_all(&sample.to_le_bytes())?;
    }
    Ok(())
}

struct CorrectOptions {
    fisb_only: bool,
    adsb_only: bool,
    no_fixed_bits: bool,
    no_tail_repair: bool,
    first_six: Vec<String>,
    trust_overlays: bool,
    fail_fisb: bool,
    fail_adsb: bool,
    compat: bool,
    capture_dir: Option<PathBuf>,
    failed_dir: Option<PathBuf>,
    schedule: Option<String>,
}

fn run_correct(opts: CorrectOptions) -> Result<()> {
    let cfg = CorrectorConfig {
        schedule: match &opts.schedule {
            Some(text) => ShiftSchedule::parse(text)?,
            None => ShiftSchedule::default(),
        },
        fixed_bit_repair: !opts.no_fixed_bits,
        tail_repair: !opts.no_tail_repair,
        first_six: parse_first_six(&opts.first_six)?,
        trust_overlays: opts.trust_overlays,
    };
    let corrector = Corrector::new(cfg);
    let style = if opts.compat {
        OutputStyle::Compat
    } else {
        OutputStyle::Full
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut header_raw = [0u8; HEADER_LEN];
    loop {
        if !read_all(&mut input, &mut header_raw)? {
            break; // clean EOF at a frame boundary
        }
        let header = FrameHeader::parse(&header_raw)?;
        let mut sample_bytes = vec![0u8; header.packet_type.frame_samples() * 4];
        if !read_all(&mut input, &mut sample_bytes)? {
            return Err(UatError::TruncatedFrame);
        }

        if let Some(dir) = &opts.capture_dir {
            write_capture(dir, &header, &sample_bytes, "i32", false)?;
        }
        let wanted = match header.packet_type {
            PacketType::Fisb => !opts.adsb_only,
            PacketType::Adsb => !opts.fisb_only,
        };
        if !wanted {
            continue;
        }

        let samples: Vec<i32> = sample_bytes
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        match corrector.correct(&header, &samples) {
            Outcome::Decoded(decoded) => {
                writeln!(out, "{}", output::success_line(&decoded, style))?;
                out.flush()?;
            }
            Outcome::Failed(failure) => {
                let report = match header.packet_type {
                    PacketType::Fisb => opts.fail_fisb,
                    PacketType::Adsb => opts.fail_adsb,
                };
                if report {
                    writeln!(out, "{}", output::failure_line(&failure))?;
                    out.flush()?;
                }
                if let Some(dir) = &opts.failed_dir {
                    write_capture(dir, &header, &sample_bytes, "frame", true)?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn parse_first_six(entries: &[String]) -> Result<Vec<[u8; 6]>> {
    entries
        .iter()
        .map(|entry| {
            if entry.len() != 12 || !entry.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(UatError::Args(format!(
                    "first-six {entry:?} is not 12 hex chars"
                )));
            }
            let mut bytes = [0u8; 6];
            for (i, byte) in bytes.iter_mut().enumerate() {
                *byte = u8::from_str_radix(&entry[i * 2..i * 2 + 2], 16)
                    .map_err(|_| UatError::Args(format!("first-six {entry:?} is not hex")))?;
            }
            Ok(bytes)
        })
        .collect()
}

/// Fill as much of `buf` as the stream will give; 0 only at EOF.
fn fill_buffer(input: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Fill `buf` exactly; `Ok(false)` when the stream ended before the first
/// byte, an error when it ends partway through.
fn read_all(input: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(UatError::TruncatedFrame);
        }
        filled += n;
    }
    Ok(true)
}

fn write_capture(
    dir: &Path,
    header: &FrameHeader,
    sample_bytes: &[u8],
    extension: &str,
    with_header: bool,
) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let name = format!(
        "{}.{:03}.{}.{}",
        header.secs,
        header.millis(),
        header.packet_type.type_byte(),
        extension
    );
    let mut file = File::create(dir.join(name))?;
    if with_header {
        file.write_all(&header.encode())?;
    }
    file.write_all(sample_bytes)?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn run_serve(port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on port {port}");

    let mut clients: Vec<tokio::net::TcpStream> = Vec::new();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            conn = listener.accept() => {
                let (socket, addr) = conn?;
                info!("client connected from {addr}");
                clients.push(socket);
            }
            line = lines.next_line() => {
                let Some(mut line) = line? else {
                    break; // stdin EOF
                };
                line.push('\n');
                clients.retain(|client| match client.try_write(line.as_bytes()) {
                    // a partial write loses the rest of the line for that
                    // client; input must never stall
                    Ok(_) => true,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        warn!("dropping a line for a slow client");
                        true
                    }
                    Err(_) => false,
                });
            }
        }
    }
    Ok(())
}
