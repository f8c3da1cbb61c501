use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use traffic_grid::{Engine, SimulationConfig};

/// The stuck threshold used when no configuration file is given.
const DEFAULT_STUCK_THRESHOLD: u32 = 7;

/// Runs a grid traffic simulation and prints the final state as JSON.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The map layout file.
    #[arg(short, long, value_name = "FILE")]
    map: PathBuf,
    /// The JSON dictionary for the map's symbols.
    #[arg(short, long, value_name = "FILE")]
    dictionary: PathBuf,
    /// A JSON simulation config. Without one, only the stuck threshold is set.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// The total number of cars to spawn.
    #[arg(short = 'n', long, default_value_t = 10)]
    cars: usize,
    /// The number of ticks to simulate.
    #[arg(short, long, default_value_t = 100)]
    ticks: u64,
    /// Overrides the seed for destination assignment.
    #[arg(short, long)]
    seed: Option<u64>,
}

fn load_config(path: Option<&PathBuf>) -> Result<SimulationConfig, String> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
            SimulationConfig::from_json(&json).map_err(|e| format!("invalid config {}: {}", path.display(), e))
        }
        None => Ok(SimulationConfig::new(DEFAULT_STUCK_THRESHOLD)),
    }
}

fn run(args: Args) -> Result<(), String> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let engine = Engine::load(&args.map, &args.dictionary, args.cars, config).map_err(|e| e.to_string())?;
    let report = engine.step(args.ticks);
    log::info!("simulated {} ticks", report.tick_number);

    let output = serde_json::json!({
        "tickNumber": report.tick_number,
        "metrics": engine.metrics(),
        "snapshot": engine.snapshot(),
    });
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output).map_err(|e| e.to_string())?;
    writeln!(stdout).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {} - {}", record.level(), record.target(), record.args()))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
