//! Headless/scripted front-end for the emulator core.
//!
//! Owns the wall-clock timing loop; the library itself never sleeps. See
//! `ControlDeck::run_frame` for the non-blocking stepping primitive this loop drives.

use anyhow::Context;
use clap::Parser;
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tetanes_core::{
    common::NesRegion,
    control_deck::{Config, ControlDeck, HeadlessMode},
};
use tracing_subscriber::EnvFilter;

/// Region selection for `--region`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Region {
    Auto,
    Ntsc,
    Pal,
    Dendy,
}

impl From<Region> for NesRegion {
    fn from(region: Region) -> Self {
        match region {
            Region::Auto => NesRegion::Auto,
            Region::Ntsc => NesRegion::Ntsc,
            Region::Pal => NesRegion::Pal,
            Region::Dendy => NesRegion::Dendy,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "emulator", version, about = "An NES/Famicom emulator core CLI")]
struct Args {
    /// Path to an iNES ROM file.
    rom: PathBuf,

    /// Window width in pixels. Ignored in `--headless` mode; kept for CLI-surface parity.
    screen_w: Option<u32>,

    /// Window height in pixels. Ignored in `--headless` mode; kept for CLI-surface parity.
    screen_h: Option<u32>,

    /// Whether the target display is a TV (affects aspect-ratio hints only).
    is_tv: Option<bool>,

    /// Apply a Game Genie code. May be repeated.
    #[arg(long = "game-genie")]
    game_genie: Vec<String>,

    /// Increase log verbosity. May be repeated (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run without any presentation hand-off; suitable for scripted TAS runs.
    #[arg(long)]
    headless: bool,

    /// NES region to emulate.
    #[arg(long, value_enum, default_value = "auto")]
    region: Region,

    /// Play back a recorded movie file instead of live input.
    #[arg(long)]
    play_movie: Option<PathBuf>,

    /// Maximum number of frames to run before exiting. Runs indefinitely if unset.
    #[arg(long)]
    frames: Option<u32>,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: Args) -> anyhow::Result<()> {
    if !args.rom.exists() {
        anyhow::bail!("rom file not found: {}", args.rom.display());
    }

    let mut config = Config {
        region: args.region.into(),
        ..Config::default()
    };
    if args.headless {
        config.headless_mode = HeadlessMode::NO_AUDIO | HeadlessMode::NO_VIDEO;
    }

    let mut deck = ControlDeck::with_config(config);
    deck.load_rom_path(&args.rom)
        .with_context(|| format!("failed to load rom {}", args.rom.display()))?;

    for code in args.game_genie {
        deck.add_genie_code(code.clone())
            .with_context(|| format!("invalid game genie code: {code}"))?;
    }

    if let Some(movie_path) = &args.play_movie {
        deck.load_movie(movie_path)
            .with_context(|| format!("failed to load movie {}", movie_path.display()))?;
    }

    let region = deck
        .cart_region()
        .unwrap_or_else(|| args.region.into());
    let fps = match region {
        NesRegion::Pal | NesRegion::Dendy => 50.006_98,
        NesRegion::Ntsc | NesRegion::Auto => 60.098_8,
    };
    let period = Duration::from_secs_f32(1.0 / fps);

    tracing::info!(rom = %args.rom.display(), ?region, "starting emulation");

    let mut frames_run = 0u32;
    loop {
        if let Some(limit) = args.frames {
            if frames_run >= limit {
                break;
            }
        }
        let start = Instant::now();
        deck.run_frame()?;
        deck.clear_audio_samples();
        frames_run += 1;

        if !args.headless {
            let elapsed = start.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }
    }

    tracing::info!(frames_run, "emulation finished");
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    if let Err(err) = run(args) {
        tracing::error!("{err:?}");
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
