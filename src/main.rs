use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::info;

use vmlife::metrics::Snapshot;
use vmlife::view;
use vmlife::{Config, Simulator};

#[derive(Parser)]
#[command(name = "vmlife", about = "Virtual machine soup: threads copying and halting on a toroidal grid")]
struct Cli {
    /// Random seed for reproducibility.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Grid rows.
    #[arg(long, default_value_t = 33)]
    rows: usize,

    /// Grid columns.
    #[arg(long, default_value_t = 117)]
    columns: usize,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 3600)]
    frames: u64,

    /// Wall-clock milliseconds fed to the simulator per frame.
    #[arg(long, default_value_t = 16)]
    frame_ms: u32,

    /// TOML settings file. Without one the built-in screensaver preset is used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output statistics every N frames.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    metrics_interval: u64,

    /// Print the final grid as text to stderr.
    #[arg(long)]
    dump: bool,

    /// Run in benchmark mode: suppress CSV, print throughput stats.
    #[arg(long)]
    benchmark: bool,

    /// Independent simulators to run side by side in benchmark mode.
    #[arg(long, default_value_t = 1)]
    replicas: u64,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Config::screensaver(),
    };

    if cli.benchmark {
        run_benchmark(&cli, &config)
    } else {
        run_simulation(&cli, config)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_simulation(cli: &Cli, config: Config) -> Result<()> {
    let mut sim = Simulator::new(cli.rows, cli.columns, config, cli.seed)?;
    info!(rows = cli.rows, columns = cli.columns, seed = cli.seed, "starting simulation");

    println!("frame,{}", Snapshot::CSV_HEADER);
    println!("0,{}", Snapshot::capture(&sim).csv_row());

    for frame in 1..=cli.frames {
        sim.behave(cli.frame_ms);
        view::finish_frame(&mut sim);

        if frame % cli.metrics_interval == 0 {
            println!("{frame},{}", Snapshot::capture(&sim).csv_row());
        }

        if frame % 600 == 0 || frame == cli.frames {
            eprint!("\rframe {frame}/{}", cli.frames);
        }
    }
    eprintln!();

    let tally = sim.tally();
    info!(
        cycles = sim.cycles(),
        spawned = tally.spawned,
        halted = tally.halted,
        faulted = tally.faulted,
        trimmed = tally.trimmed,
        "simulation finished"
    );

    if cli.dump {
        eprint!("{}", view::render_text(&sim));
    }
    Ok(())
}

fn run_benchmark(cli: &Cli, config: &Config) -> Result<()> {
    let replicas = cli.replicas.max(1);
    let start = std::time::Instant::now();

    // Each replica owns its simulator; nothing is shared between them.
    let cycles = (0..replicas)
        .into_par_iter()
        .map(|i| -> Result<u64> {
            let mut sim = Simulator::new(
                cli.rows,
                cli.columns,
                config.clone(),
                cli.seed.wrapping_add(i),
            )?;
            for _ in 0..cli.frames {
                sim.behave(cli.frame_ms);
                view::finish_frame(&mut sim);
            }
            Ok(sim.cycles())
        })
        .collect::<Result<Vec<u64>>>()?;
    let elapsed = start.elapsed();

    let total_cycles: u64 = cycles.iter().sum();
    let total_frames = cli.frames * replicas;
    let cells = (cli.rows * cli.columns) as u64;
    let cycles_per_sec = total_cycles as f64 / elapsed.as_secs_f64();
    let frames_per_sec = total_frames as f64 / elapsed.as_secs_f64();

    eprintln!("Benchmark results:");
    eprintln!("  Grid:              {}x{} ({cells} cells)", cli.rows, cli.columns);
    eprintln!("  Replicas:          {replicas}");
    eprintln!("  Frames:            {total_frames}");
    eprintln!("  Cycles:            {total_cycles}");
    eprintln!("  Elapsed:           {elapsed:.2?}");
    eprintln!("  Frames/sec:        {frames_per_sec:.1}");
    eprintln!("  Cycles/sec:        {cycles_per_sec:.1}");
    Ok(())
}
