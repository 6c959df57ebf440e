mod cli;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use cli::Cli;
use render::report::{summarize, VisualizationReport};
use wavescope::config::{self, Config};
use wavescope::playback::{CpalSink, PlaybackEvent, SilentSink, SinkFactory, SinkProbe, StartOutcome};
use wavescope::session::{self, SessionStore};
use wavescope::CoreError;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli);
    cfg.display
        .validate()
        .context("Invalid display configuration")?;

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let sinks: SinkFactory = if cli.silent {
        SilentSink::factory(SinkProbe::default())
    } else {
        CpalSink::factory()
    };
    let mut store = SessionStore::new(sinks, cfg.playback.clone());

    // 1. Decode and load
    let session = session::select_and_load(&mut store, &cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    let buffer = session.buffer();
    println!(
        "Loaded file: {}",
        session.source_file_name().unwrap_or("<unnamed>")
    );
    println!(
        "  {}Hz, {} ch, {}, {} frames, {:.3}s",
        buffer.sample_rate(),
        buffer.channels(),
        buffer.sample_format(),
        buffer.frames(),
        buffer.duration()
    );

    // 2. Spectrogram
    if !cli.no_analysis {
        match session::request_visualization(session, &cfg.analysis) {
            Ok(spectrogram) => {
                println!("  {}", summarize(&spectrogram));
                if let Some(ref path) = cli.report {
                    VisualizationReport::new(session, &spectrogram, cfg.display.clip_multiple).write(path)?;
                }
            }
            Err(CoreError::EmptySignal) => {
                log::warn!("Audio is empty, skipping visualization");
            }
            Err(e) => return Err(e).context("Spectrogram analysis failed"),
        }
    }

    // 3. Playback
    if cli.play {
        play_to_end(session)?;
    }

    // 4. Save
    if let Some(ref path) = cli.save {
        if buffer.is_empty() {
            log::warn!("No audio to save");
        } else {
            session::save_as(session, path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            println!("Audio saved to {}", path.display());
        }
    }

    store.clear();
    Ok(())
}

fn play_to_end(session: &session::Session) -> Result<()> {
    let playback = session.playback();
    let events = playback.subscribe();

    match playback.start().context("Playback failed")? {
        StartOutcome::Started => {}
        StartOutcome::NoAudio | StartOutcome::AlreadyPlaying => return Ok(()),
    }

    let duration_ms = (session.duration() * 1000.0).round() as u64;
    let pb = ProgressBar::new(duration_ms);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    for event in events.iter() {
        match event {
            PlaybackEvent::Position(state) => {
                pb.set_position((state.elapsed_seconds * 1000.0).round() as u64);
                pb.set_message(format!("{:.1}s / {:.1}s", state.elapsed_seconds, session.duration()));
                if !state.is_playing() {
                    break;
                }
            }
            PlaybackEvent::Finished => break,
            PlaybackEvent::DeviceError(err) => {
                pb.abandon_with_message("device error");
                anyhow::bail!("Output device failed during playback: {}", err);
            }
        }
    }

    pb.finish_with_message("Playback complete");
    Ok(())
}

fn resolve_config(cli: &Cli) -> Config {
    // Explicit --config path, or auto-detect wavescope.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("wavescope.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("wavescope").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("wavescope").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    // CLI values win whenever they differ from their defaults
    if cli.window_length != 256 { cfg.analysis.window_length = cli.window_length; }
    if cli.overlap != 32 { cfg.analysis.overlap = cli.overlap; }
    if cli.clip_multiple != 10.0 { cfg.display.clip_multiple = cli.clip_multiple; }
    if cli.poll_ms != 100 { cfg.playback.poll_interval_ms = cli.poll_ms; }

    cfg
}
