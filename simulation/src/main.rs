use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tenor_simulation::{Simulation, SimulationConfig};

#[derive(Parser, Debug)]
#[command(name = "tenor-sim")]
#[command(about = "Agent-based simulation of a tenor fixed-rate pool")]
struct Args {
    /// Path to simulation configuration file
    #[arg(short, long, default_value = "simulation/scenarios/default.toml")]
    config: String,

    /// Log filter, overrides the configured level
    #[arg(long)]
    log_level: Option<String>,

    /// Override the number of steps
    #[arg(long)]
    steps: Option<u64>,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_default: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = args.write_default {
        SimulationConfig::default()
            .save(&path)
            .with_context(|| format!("writing default config to {}", path))?;
        println!("Wrote default configuration to {}", path);
        return Ok(());
    }

    let mut config = SimulationConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config))?;
    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    config.validate()?;

    init_logging(args.log_level.as_deref().unwrap_or(&config.log_level));

    info!(
        config = %args.config,
        steps = config.run.steps,
        agents = config.agents.count,
        seed = config.run.seed,
        "Starting tenor simulation"
    );

    let report = Simulation::new(config)?.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!(
            steps = report.steps,
            spot_rate = report.spot_rate,
            variable_rate = report.variable_rate,
            lp_share_price = report.lp_share_price,
            present_value = report.present_value,
            checkpoints = report.checkpoints,
            insolvent_steps = report.insolvent_steps,
            "Simulation finished"
        );
        for (action, stats) in &report.actions {
            info!(action = %action, executed = stats.executed, rejected = stats.rejected, "action totals");
        }
        for (error, count) in &report.rejections {
            info!(error = %error, count, "rejections");
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tenor_simulation={level},tenor_sim={level},tenor_core={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
