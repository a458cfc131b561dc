//! Console level meter.
//!
//! Run with `--help` for options.
//!
//! Set `RUST_LOG=debug` for capture thread diagnostics.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use pcm_capture_core::storage::settings::read_settings;
use pcm_capture_core::{AudioEngine, AudioInputController, CaptureError, FormatDescriptor, InputDevice};
use pcm_capture_cpal::{list_input_devices, CpalInputDevice};

/// Render tick the meter is polled at.
const TICK: Duration = Duration::from_millis(33);
const BAR_WIDTH: usize = 50;

/// Print live input levels from an audio capture device
#[derive(Parser, Debug)]
#[command(name = "pcm-level-meter", version, about, long_about = None)]
struct Options {
    /// List input devices and exit
    #[arg(long)]
    list: bool,

    /// Input device name (default: host default input)
    #[arg(short, long)]
    device: Option<String>,

    /// Stop after this many seconds (default: run until interrupted)
    #[arg(short, long)]
    seconds: Option<u64>,

    /// Engine settings JSON to apply before enabling
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Capture one channel instead of two
    #[arg(long)]
    mono: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Options::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(options: Options) -> Result<(), CaptureError> {
    if options.list {
        for info in list_input_devices()? {
            println!(
                "{}{} ({} ch, {}-{} Hz)",
                if info.is_default { "* " } else { "  " },
                info.name,
                info.max_channels,
                info.min_sample_rate,
                info.max_sample_rate
            );
        }
        return Ok(());
    }

    let device = match options.device {
        Some(name) => CpalInputDevice::with_name(name),
        None => CpalInputDevice::default_device(),
    };
    let format = if options.mono {
        FormatDescriptor::mono(44100.0)
    } else {
        FormatDescriptor::default()
    };
    let mut engine = AudioEngine::new(AudioInputController::with_format(device, format)?);

    match options.settings {
        Some(path) => {
            let mut settings = read_settings(&path)?;
            settings.enabled = true;
            engine.apply_settings(settings)?;
        }
        None => engine.set_enabled(true)?,
    }
    if !engine.input().state().is_running() {
        return Err(CaptureError::DeviceNotAvailable(format!(
            "could not open {}",
            engine.input().device().name()
        )));
    }

    let meter = engine.meter();
    let deadline = options.seconds.map(|s| Instant::now() + Duration::from_secs(s));
    while deadline.map_or(true, |d| Instant::now() < d) {
        thread::sleep(TICK);
        if !engine.input().state().is_open() {
            log::warn!("Input went away");
            break;
        }
        if let Some(levels) = meter.poll() {
            let filled = (levels.mix_level * BAR_WIDTH as f32).round() as usize;
            let peak = ((levels.held_peak * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH - 1);
            let mut bar: Vec<char> = (0..BAR_WIDTH)
                .map(|i| if i < filled { '#' } else { ' ' })
                .collect();
            bar[peak] = '|';
            println!(
                "[{}] L {:.3} R {:.3} mix {:.3}",
                bar.into_iter().collect::<String>(),
                levels.left_level,
                levels.right_level,
                levels.mix_level
            );
        }
    }

    if let Some(diag) = engine.input().diagnostics() {
        log::info!(
            "Session {}: {} chunks, {} short reads, {} device events",
            diag.session_id,
            diag.chunks_captured,
            diag.short_reads,
            diag.device_events
        );
    }
    engine.shutdown()
}
