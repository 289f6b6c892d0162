use std::process::ExitCode;
use std::time::Duration;

use thread_counting::{ConsoleSink, Coordinator, CountingConfig, Result, TaskOutcome, BANNER};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Options {
    /// value the up thread counts to
    #[clap(short, long)]
    #[clap(default_value_t = thread_counting::config::DEFAULT_BOUND)]
    bound: i64,

    /// pause before every step, in milliseconds
    #[clap(short, long)]
    #[clap(default_value_t = thread_counting::config::DEFAULT_PACE.as_millis() as u64)]
    pace_ms: u64,

    /// give up waiting for the up thread after this many milliseconds
    #[clap(short, long)]
    wait_timeout_ms: Option<u64>,

    /// skip the banner
    #[clap(short, long)]
    quiet: bool,
}

impl Options {
    fn config(&self) -> CountingConfig {
        let mut config = CountingConfig::default()
            .with_bound(self.bound)
            .with_pace(Duration::from_millis(self.pace_ms));
        if let Some(ms) = self.wait_timeout_ms {
            config = config.with_wait_timeout(Duration::from_millis(ms));
        }
        config
    }
}

fn run(options: Options) -> Result<()> {
    if !options.quiet {
        println!("{}", BANNER);
    }

    let mut coordinator = Coordinator::new(options.config());
    let summary = coordinator.run(&ConsoleSink)?;
    info!("run started at {}", summary.started_at.format("%Y-%m-%d %H:%M:%S%.3f"));

    for (name, outcome) in [(&summary.up_name, &summary.up), (&summary.down_name, &summary.down)] {
        if let TaskOutcome::Failed(reason) = outcome {
            eprintln!("{} encountered an error: {}", name, reason);
        }
    }

    if summary.all_completed() {
        println!("\nBoth threads have completed their counting without errors.");
    } else {
        println!("\nCounting finished with task errors.");
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Options::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("thread counting failed: {}", e);
            eprintln!("Thread system error: {}", e);
            ExitCode::FAILURE
        }
    }
}
