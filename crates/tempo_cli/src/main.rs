//! Tempo CLI
//!
//! Play tween scenes at a fixed frame rate and inspect easing curves.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tempo_animation::{EasingKind, TweenValue};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod driver;

use config::SceneConfig;

#[derive(Parser)]
#[command(name = "tempo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tempo tween engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scene file and print every tween value
    Run {
        /// Scene file (TOML)
        scene: PathBuf,

        /// Override the scene's frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Only print completions, not per-frame values
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the available easing curves
    Curves,

    /// Print a normalized easing curve
    Sample {
        /// Curve name, e.g. ease_in_out_quad
        easing: String,

        /// Number of intervals between t = 0 and t = 1
        #[arg(short, long, default_value = "10")]
        steps: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { scene, fps, quiet } => cmd_run(&scene, fps, quiet),
        Commands::Curves => cmd_curves(),
        Commands::Sample { easing, steps } => cmd_sample(&easing, steps),
    }
}

fn cmd_run(path: &Path, fps: Option<u32>, quiet: bool) -> Result<()> {
    let mut scene = SceneConfig::load(path)?;
    if let Some(fps) = fps {
        scene.driver.fps = fps;
        scene.validate()?;
    }

    info!("Playing {} at {} fps", path.display(), scene.driver.fps);
    let report = driver::play(scene)?;

    if !quiet {
        for sample in &report.samples {
            println!(
                "{:>5}  {:>7.3}s  {:<16} {}",
                sample.frame,
                sample.time,
                sample.tween,
                format_value(sample.value)
            );
        }
    }
    for (tween, at) in &report.completed {
        println!("done   {:>7.3}s  {}", at, tween);
    }

    if report.finished {
        info!("Scene finished after {} frames", report.frames);
    } else {
        anyhow::bail!(
            "Scene did not finish within {} frames; raise driver.max_frames",
            report.frames
        );
    }
    Ok(())
}

fn cmd_curves() -> Result<()> {
    for easing in EasingKind::ALL {
        println!("{:>2}  {}", easing as u8, easing);
    }
    Ok(())
}

fn cmd_sample(name: &str, steps: u32) -> Result<()> {
    let easing: EasingKind = name.parse()?;

    println!("{}", easing);
    for (t, value) in driver::sample_curve(easing, steps) {
        let width = (value.clamp(0.0, 1.0) * 40.0).round() as usize;
        println!("{:.3}  {:>7.4}  |{}", t, value, "#".repeat(width));
    }
    Ok(())
}

fn format_value(value: TweenValue) -> String {
    match value {
        TweenValue::Scalar(v) => format!("{:.3}", v),
        TweenValue::Vector3(v) => v.to_string(),
    }
}
