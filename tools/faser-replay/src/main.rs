//! Replay recorded FSR sample traces through the pad engine on the host.
//!
//! Trace format, one entry per line:
//!
//! ```text
//! # comment
//! <us>,<ch0>,<ch1>,<ch2>,<ch3>    sample row, ticked at that timestamp
//! ><command>                      serial command queued at this point
//! ```
//!
//! Queued commands drain at the pad's serial poll cadence (one byte every
//! tenth tick), so a command needs sample rows after it to take effect,
//! exactly as on the wire. Key events print as `key_press|key:<k>` /
//! `key_release|key:<k>`; diagnostic lines print verbatim.

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use faser::{CommunicationPort, KeyPort, Pad, PadConfig, SensorPort, ThresholdPolicy};

const CHANNELS: usize = faser::config::SENSOR_COUNT;

#[derive(Parser)]
#[command(about = "Replay recorded FSR sample traces through the pad engine")]
struct Args {
    /// Trace file with sample rows and `>`-prefixed command injections.
    trace: PathBuf,
    /// Expected key events, one `press <key>` / `release <key>` per line.
    #[arg(long)]
    expect: Option<PathBuf>,
    /// Use the adaptive drift-compensating threshold policy.
    #[arg(long)]
    adaptive: bool,
    /// Release at this value instead of the press threshold (hysteresis).
    #[arg(long, conflicts_with = "adaptive")]
    release_limit: Option<i32>,
    /// Re-assert key state at the firmware's time-sliced flush cadence.
    #[arg(long)]
    key_refresh: bool,
    /// Suppress sensor_state diagnostics.
    #[arg(long)]
    quiet: bool,
}

enum TraceEntry {
    Sample { us: u32, values: [i32; CHANNELS] },
    Command(String),
}

struct TraceSensors {
    values: [i32; CHANNELS],
}

impl SensorPort for TraceSensors {
    fn read(&mut self, pin: u8) -> i32 {
        self.values.get(pin as usize).copied().unwrap_or(0)
    }
}

#[derive(Default)]
struct PrintingKeys {
    events: Vec<(u8, bool)>,
}

impl KeyPort for PrintingKeys {
    fn press(&mut self, key: u8) {
        println!("key_press|key:{}", key as char);
        self.events.push((key, true));
    }

    fn release(&mut self, key: u8) {
        println!("key_release|key:{}", key as char);
        self.events.push((key, false));
    }
}

#[derive(Default)]
struct StdoutLink {
    pending: VecDeque<u8>,
}

impl CommunicationPort for StdoutLink {
    fn read_byte(&mut self) -> Option<u8> {
        self.pending.pop_front()
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let entries = parse_trace(&args.trace)?;
    let policy = if args.adaptive {
        ThresholdPolicy::adaptive()
    } else if let Some(limit) = args.release_limit {
        ThresholdPolicy::fixed_with_release_limit(limit)
    } else {
        ThresholdPolicy::fixed()
    };
    let config = PadConfig::<CHANNELS> {
        policy,
        debug: !args.quiet,
        key_refresh_us: args
            .key_refresh
            .then_some(faser::config::KEY_REFRESH_INTERVAL_US),
        ..PadConfig::default()
    };
    let mut pad = Pad::new(config).context("invalid pad configuration")?;

    let mut sensors = TraceSensors {
        values: [0; CHANNELS],
    };
    let mut keys = PrintingKeys::default();
    let mut link = StdoutLink::default();

    let mut rows = 0usize;
    for entry in &entries {
        match entry {
            TraceEntry::Command(command) => {
                log::debug!("queueing command {command:?}");
                link.pending.extend(command.as_bytes());
                link.pending.push_back(b'\n');
            }
            TraceEntry::Sample { us, values } => {
                sensors.values = *values;
                pad.tick(*us, &mut sensors, &mut keys, &mut link);
                rows += 1;
            }
        }
    }
    log::info!("replayed {rows} sample rows, {} key events", keys.events.len());

    if let Some(expect_path) = &args.expect {
        check_expectations(expect_path, &keys.events)?;
        println!("expect: ok ({} events)", keys.events.len());
    }
    Ok(())
}

fn parse_trace(path: &Path) -> Result<Vec<TraceEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading trace {}", path.display()))?;
    let mut entries = Vec::new();
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(command) = line.strip_prefix('>') {
            entries.push(TraceEntry::Command(command.trim().to_string()));
            continue;
        }
        let mut fields = line.split(',');
        let us: u32 = fields
            .next()
            .and_then(|field| field.trim().parse().ok())
            .with_context(|| format!("{}:{}: bad timestamp", path.display(), line_no + 1))?;
        let mut values = [0i32; CHANNELS];
        for (channel, slot) in values.iter_mut().enumerate() {
            *slot = fields
                .next()
                .and_then(|field| field.trim().parse().ok())
                .with_context(|| {
                    format!(
                        "{}:{}: bad value for channel {}",
                        path.display(),
                        line_no + 1,
                        channel
                    )
                })?;
        }
        if fields.next().is_some() {
            bail!("{}:{}: trailing fields", path.display(), line_no + 1);
        }
        entries.push(TraceEntry::Sample { us, values });
    }
    Ok(entries)
}

fn check_expectations(path: &Path, events: &[(u8, bool)]) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading expectations {}", path.display()))?;
    let mut expected = Vec::new();
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (action, key) = line
            .split_once(' ')
            .with_context(|| format!("{}:{}: expected `<action> <key>`", path.display(), line_no + 1))?;
        let pressed = match action {
            "press" => true,
            "release" => false,
            other => bail!("{}:{}: unknown action {other:?}", path.display(), line_no + 1),
        };
        let key = key.trim();
        if key.len() != 1 {
            bail!("{}:{}: key must be a single character", path.display(), line_no + 1);
        }
        expected.push((key.as_bytes()[0], pressed));
    }

    if expected != events {
        let render = |list: &[(u8, bool)]| -> String {
            list.iter()
                .map(|(key, pressed)| {
                    format!(
                        "{} {}",
                        if *pressed { "press" } else { "release" },
                        *key as char
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        bail!(
            "key events diverge\n  expected: [{}]\n  actual:   [{}]",
            render(&expected),
            render(events)
        );
    }
    Ok(())
}
