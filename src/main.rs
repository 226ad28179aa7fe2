//! Finger Sequence Trainer - terminal front end
//!
//! Single-session CLI application. The keyboard stands in for the finger
//! sensor; every frame the key states become raw angles that run through the
//! signal conditioner and the trial state machine.

mod cli;

use clap::Parser;
use cli::display::Display;
use cli::input::{Command, InputHandler, KeyboardStandIn};
use cli::recorder::Recorder;
use finger_seq_trainer::session::{DiscardSink, FrameInput, RecordSink};
use finger_seq_trainer::ExperimentConfig;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "Finger Sequence Trainer")]
#[command(about = "Cued finger sequence task with adaptive press detection")]
struct Args {
    /// Subject ID (logs go to <log-dir>/<subject>)
    #[arg(short, long, default_value = "demo")]
    subject: String,

    /// Path to the JSON configuration
    #[arg(short, long, default_value = "config/default.json")]
    config: PathBuf,

    /// Directory for subject logs
    #[arg(short, long, default_value = "logs")]
    log_dir: PathBuf,

    /// Start with filtering disabled
    #[arg(long)]
    no_filter: bool,

    /// Run without writing log files
    #[arg(long)]
    no_log: bool,

    /// Use the alternate screen
    #[arg(short, long)]
    fullscreen: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the configuration, falling back to the built-in experiment
fn load_config(path: &Path) -> Result<ExperimentConfig, Box<dyn Error>> {
    if path.exists() {
        Ok(ExperimentConfig::load(path)?)
    } else {
        warn!(path = %path.display(), "configuration not found, using defaults");
        Ok(ExperimentConfig::default())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config = load_config(&args.config)?;
    if args.no_filter {
        config.use_filter = false;
    }

    if args.no_log {
        config.log_records = false;
    }

    let mut conditioner = config.conditioner()?;
    let mut machine = config.state_machine()?;

    let mut recorder: Box<dyn RecordSink> = if config.log_records {
        let longest = config
            .sequences
            .values()
            .map(|def| def.seq.len())
            .max()
            .unwrap_or(0);
        Box::new(Recorder::create(
            &args.log_dir,
            &args.subject,
            config.num_fingers,
            longest,
            config.finger_round,
            config.time_round,
        )?)
    } else {
        info!("logging disabled");
        Box::new(DiscardSink)
    };
    info!(subject = %args.subject, channels = config.num_fingers, "session ready");

    let mut stand_in = KeyboardStandIn::new(
        config.num_fingers,
        config.display_angle_max,
        config.display_angle_min,
    );

    // Initialize display and input
    let mut display = if args.fullscreen {
        Display::fullscreen()?
    } else {
        Display::simple()?
    };
    display.clear()?;
    let mut input = InputHandler::new(config.key_codes.clone());
    input.enable_raw_mode()?;

    let clock = Instant::now();
    let mut last = 0.0;
    let mut completed = false;

    // Frame loop
    'session: loop {
        let commands = input.poll_commands()?;
        let now = clock.elapsed().as_secs_f64();
        for command in commands {
            match command {
                Command::Quit => {
                    info!("quit requested");
                    break 'session;
                }
                Command::ToggleFilter => {
                    conditioner.toggle_filter();
                    info!(filtering = conditioner.filtering(), "filter toggled");
                }
                other => stand_in.apply(other, now),
            }
        }

        let dt = now - last;
        last = now;
        conditioner.ingest_frame(&stand_in.samples(now), dt);
        let edges = conditioner.drain_edges();
        let levels = conditioner.levels();
        let filtered = conditioner.filtered_angles();

        let out = machine.step(&FrameInput {
            now,
            edges: &edges,
            levels: &levels,
            filtered: &filtered,
        });
        for record in &out.records {
            recorder.record(record)?;
        }

        let hand = out.intent.active_hand.unwrap_or(config.start_hand);
        let offset = hand.channel_offset(config.num_active_fingers);
        let positions: Vec<f64> = (0..config.num_active_fingers)
            .map(|key| conditioner.key_position(key + offset))
            .collect();
        display.render(&out.intent, &positions, conditioner.filtering())?;

        if out.finished {
            completed = true;
            break 'session;
        }
    }

    // Cleanup
    input.disable_raw_mode()?;
    display.shutdown()?;
    recorder.flush()?;

    display.clear()?;
    if completed {
        println!("All done!");
    } else {
        println!("Session stopped early.");
    }
    display.show_summary(&machine.ledger().summary())?;

    Ok(())
}
