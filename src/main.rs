use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{info, Level};

use dewpoint_mlp::dewpoint::{self, TargetRange};
use dewpoint_mlp::{
    spawn_training, Network, Observer, ObserverError, SavedModel, Shuffle, Snapshot, TrainConfig,
    TrainingState,
};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// More logging (-v: debug, -vv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a dew-point corpus and train a network on it
    Train {
        /// JSON training config; flags below override it
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
        #[arg(short, long, value_name = "INT", default_value_t = 100_000)]
        samples: usize,
        #[arg(short, long, value_name = "INT")]
        epochs: Option<usize>,
        #[arg(short, long, value_name = "INT")]
        batch_size: Option<usize>,
        #[arg(short, long, value_name = "FLOAT")]
        learning_rate: Option<f32>,
        /// Seeds the corpus, the initial weights and the shuffle [default: 0]
        #[arg(long, value_name = "INT")]
        seed: Option<u64>,
        /// Write the trained parameters here
        #[arg(long, value_name = "PATH")]
        save: Option<PathBuf>,
    },
    /// Predict a dew point (°C) with a saved model
    Predict {
        #[arg(short, long, value_name = "PATH")]
        model: PathBuf,
        /// Air temperature, °C
        #[arg(short, long, allow_negative_numbers = true)]
        temperature: f32,
        /// Relative humidity, %
        #[arg(short = 'r', long)]
        humidity: f32,
        /// Pressure, hPa
        #[arg(short, long)]
        pressure: f32,
    },
}

fn install_logger(verbose: u8) -> Result<(), SetGlobalDefaultError> {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Layer explicit flags over the config file (or the defaults).
///
/// An explicit `--seed` also reseeds the shuffle, whatever the file says.
fn train_config(
    path: Option<&Path>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f32>,
    seed: Option<u64>,
) -> dewpoint_mlp::Result<TrainConfig> {
    let mut cfg = match path {
        Some(path) => TrainConfig::from_json_file(path)?,
        None => TrainConfig::default(),
    };
    cfg.epochs = epochs.unwrap_or(cfg.epochs);
    cfg.batch_size = batch_size.unwrap_or(cfg.batch_size);
    cfg.learning_rate = learning_rate.unwrap_or(cfg.learning_rate);
    if let Some(seed) = seed {
        cfg.shuffle = Shuffle::Seeded(seed);
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Logs each epoch with the last sample mapped back to °C.
struct ConsoleObserver {
    range: TargetRange,
}

impl Observer for ConsoleObserver {
    fn on_snapshot(&mut self, s: &Snapshot) -> Result<(), ObserverError> {
        info!(
            epoch = s.epoch,
            mse = s.mse,
            target_c = self.range.denormalize(s.last_target),
            output_c = self.range.denormalize(s.last_output),
            "snapshot"
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    install_logger(args.verbose)?;

    match args.command {
        Command::Train {
            config,
            samples,
            epochs,
            batch_size,
            learning_rate,
            seed,
            save,
        } => {
            let cfg = train_config(config.as_deref(), epochs, batch_size, learning_rate, seed)?;
            let seed = seed.unwrap_or(0);

            let corpus = dewpoint::generate_with_seed(samples, seed)?;
            info!(
                samples,
                min_c = corpus.target_range.min,
                max_c = corpus.target_range.max,
                "generated corpus"
            );

            let observer = ConsoleObserver {
                range: corpus.target_range,
            };
            let handle = spawn_training(Network::new_with_seed(seed), corpus.dataset, cfg, observer)?;
            let (network, report) = handle.join()?;

            if report.state != TrainingState::Completed {
                info!(state = ?report.state, "training stopped early");
            }
            info!(
                epochs = report.epochs_completed,
                skipped_batches = report.skipped_batches,
                final_mse = ?report.final_mse(),
                "training finished"
            );

            if let Some(path) = save {
                SavedModel::new(&network, Some(corpus.target_range)).save_json(&path)?;
                info!(path = %path.display(), "saved model");
            }
        }
        Command::Predict {
            model,
            temperature,
            humidity,
            pressure,
        } => {
            let saved = SavedModel::load_json(&model)?;
            let range = saved.target_range;
            let network = saved.into_network()?;

            let input = dewpoint::normalize_reading(temperature, humidity, pressure);
            let y = network.predict(&input)?;
            match range {
                Some(range) => println!("{:.2}", range.denormalize(y)),
                None => println!("{y} (normalized; model has no target range)"),
            }
        }
    }
    Ok(())
}
