mod simulate;

use anyhow::Result;
use clap::Parser;
use pairex_experiment::{ExperimentConfig, Session, TimelineBuilder, assign};
use pairex_sink::JsonLinesSink;
use pairex_timing::MonotonicClock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs one full session with a scripted participant and appends every
/// trial result to a JSONL file. Useful for checking a config end to end
/// before putting it in front of real participants.
#[derive(Parser, Debug)]
#[command(name = "pairex", version, about)]
struct Args {
    /// Participant identifier; a random one is drawn when omitted
    #[arg(long)]
    id: Option<u32>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Experiment config as JSON; built-in study tables when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// File to append result records to, one JSON object per line
    #[arg(long, default_value = "results.jsonl")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ExperimentConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ExperimentConfig::default(),
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let ctx = assign(args.id, &config, &mut rng);
    let timeline = TimelineBuilder::new(&config).build(&ctx, &mut rng);
    info!(
        participant = ctx.id,
        condition = %ctx.condition,
        trials = timeline.len(),
        "timeline ready"
    );

    let sink = JsonLinesSink::open(&args.out)?;
    let mut session = Session::new(ctx, timeline, &config, MonotonicClock::new(), sink);

    let answered = simulate::run_scripted(&mut session, &mut rng);
    info!(answered, out = %args.out.display(), "session complete");

    Ok(())
}
