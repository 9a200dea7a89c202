//! Stochastic Reserving CLI
//!
//! Command-line interface for running reserve simulations from a JSON
//! request or on the built-in RAA triangle

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;
use stochastic_reserving::tail::best_curve;
use stochastic_reserving::{demo, ReservingEngine, SimulationRequest, SimulationResponse};

#[derive(Debug, Parser)]
#[command(name = "stochastic_reserving", version, about = "Monte Carlo claims-reserve simulation")]
struct Cli {
    /// JSON request file
    #[arg(short, long, conflicts_with = "demo")]
    request: Option<PathBuf>,

    /// Run on the RAA demonstration triangle
    #[arg(long)]
    demo: bool,

    /// Override the number of simulated paths
    #[arg(long)]
    sims: Option<usize>,

    /// Override the paths per batch
    #[arg(long)]
    batch: Option<usize>,

    /// Override the main seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run batches on a single thread
    #[arg(long)]
    serial: bool,

    /// Write the per-path ultimates to a CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the JSON response to a file instead of printing the summary
    #[arg(long)]
    json: Option<PathBuf>,

    /// Include every path in the JSON response
    #[arg(long)]
    include_paths: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let (engine, mut config) = match (&cli.request, cli.demo) {
        (Some(path), _) => {
            let request = SimulationRequest::from_path(path)
                .with_context(|| format!("Failed to read request {}", path.display()))?;
            let engine = ReservingEngine::from_request(&request).context("Invalid simulation request")?;
            (engine, request.simulation_config())
        }
        (None, true) => (
            ReservingEngine::new(demo::raa_inputs()).context("Invalid demo inputs")?,
            Default::default(),
        ),
        (None, false) => bail!("either --request <FILE> or --demo is required"),
    };

    if let Some(sims) = cli.sims {
        config.sim_total = sims;
    }
    if let Some(batch) = cli.batch {
        config.batch_sim = batch;
    }
    if let Some(seed) = cli.seed {
        config.main_seed = seed;
    }
    if cli.serial {
        config = config.serial();
    }

    let inputs = engine.inputs();
    println!("Stochastic Reserving v{}", env!("CARGO_PKG_VERSION"));
    println!("============================\n");
    println!("Origin periods:    {}", inputs.rows());
    println!("Development steps: {}", inputs.n_dev());
    println!("Tail periods:      {}", inputs.tail.tail_length);
    println!();

    let point = engine.point_estimate().context("Point estimate failed")?;
    let result = engine.simulate(&config).context("Simulation failed")?;
    let summary = result.summary();

    println!("Latest diagonal:   {:>14.2}", engine.latest_diagonal());
    println!("Point estimate:    {:>14.2} gross, {:>14.2} net discounted", point.gross, point.net_discounted);
    println!();
    println!("{:>10} {:>14} {:>14} {:>14}", "", "Gross", "Gross disc", "Net disc");
    println!("{}", "-".repeat(55));
    let columns = [&summary.gross, &summary.gross_discounted, &summary.net_discounted];
    println!(
        "{:>10} {:>14.2} {:>14.2} {:>14.2}",
        "Mean", columns[0].mean, columns[1].mean, columns[2].mean
    );
    println!(
        "{:>10} {:>14.2} {:>14.2} {:>14.2}",
        "Std dev", columns[0].std_dev, columns[1].std_dev, columns[2].std_dev
    );
    for p in &columns[0].percentiles {
        let values: Vec<f64> = columns.iter().map(|c| c.percentile(p.level).unwrap_or(f64::NAN)).collect();
        println!(
            "{:>10} {:>14.2} {:>14.2} {:>14.2}",
            format!("P{}", p.level),
            values[0],
            values[1],
            values[2]
        );
    }

    let curves = engine.tail_curves();
    if !curves.is_empty() {
        let best = best_curve(&curves).map(|fit| fit.family);
        println!("\nTail curves on age-to-age factors:");
        println!("{:>14} {:>10} {:>10} {:>8}", "Curve", "Slope", "Intercept", "R²");
        for fit in &curves {
            println!(
                "{:>14} {:>10.4} {:>10.4} {:>8.4}{}",
                fit.family.to_string(),
                fit.slope,
                fit.intercept,
                fit.r_squared,
                if Some(fit.family) == best { "  *" } else { "" }
            );
        }
    }

    if let Some(path) = &cli.output {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        result.write_csv(BufWriter::new(file))?;
        println!("\nWrote {} paths to {}", result.len(), path.display());
    }

    if let Some(path) = &cli.json {
        let response = SimulationResponse::new(
            &config,
            &engine,
            &result,
            cli.include_paths,
            start.elapsed().as_millis() as u64,
        )?;
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &response)?;
        println!("Wrote response to {}", path.display());
    }

    println!("\nCompleted in {:?}", start.elapsed());
    Ok(())
}
