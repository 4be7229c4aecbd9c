use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symbind::config::{ConfigSection, Hyperparameters};
use symbind::{ConfigManager, DisplayFormat, Estimator, ForeignEngine, Matrix, Program};

#[derive(Parser)]
#[command(name = "symbind")]
#[command(about = "Fit symbolic programs with a native engine and evaluate them safely")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a program on a JSON matrix of samples
    Eval {
        /// Program text, e.g. "mul(X0, 2)"
        #[arg(short, long)]
        program: String,

        /// JSON file holding a 2-D array, one inner array per sample
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Print a program in another notation
    Display {
        #[arg(short, long)]
        program: String,

        /// code, infix, dot or tree
        #[arg(short, long, default_value = "infix")]
        format: String,
    },

    /// Print the hyperparameters, their defaults and bounds as JSON
    Params {
        /// TOML file with hyperparameters to show instead of the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Fit a program with a native engine library
    Fit {
        /// Path to the engine's shared library
        #[arg(short, long)]
        library: PathBuf,

        /// JSON file holding a 2-D array, one inner array per sample
        #[arg(short, long)]
        data: PathBuf,

        /// JSON file holding the target array
        #[arg(short, long)]
        target: PathBuf,

        /// TOML file with hyperparameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the fitted model as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn cmd_eval(program: &str, data: &Path) -> Result<()> {
    let x: Matrix = read_json(data)?;
    let program = Program::parse(program)?;
    let predictions = program.evaluate(&x)?;
    println!("{}", serde_json::to_string(&predictions)?);
    Ok(())
}

fn cmd_display(program: &str, format: &str) -> Result<()> {
    let format: DisplayFormat = format.parse().map_err(anyhow::Error::msg)?;
    println!("{}", Program::parse(program)?.display(format));
    Ok(())
}

fn cmd_params(config: Option<&Path>) -> Result<()> {
    let hyperparameters = match config {
        Some(_) => ConfigManager::resolve(config)?,
        None => Hyperparameters::default(),
    };
    println!("{}", serde_json::to_string_pretty(&hyperparameters.to_manifest())?);
    Ok(())
}

fn cmd_fit(
    library: &Path,
    data: &Path,
    target: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let hyperparameters = ConfigManager::resolve(config)?;
    let engine = ForeignEngine::init(library)?;
    let x: Matrix = read_json(data)?;
    let y: Vec<f64> = read_json(target)?;

    let mut estimator = Estimator::new(hyperparameters, Arc::new(engine));
    let program = estimator.fit(&x, &y, None)?;
    println!("{}", program.source());
    log::info!("Training score: {}", estimator.score(&x, &y)?);

    if let Some(path) = output {
        let model = estimator.export_model()?;
        std::fs::write(path, model.to_json()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("Model saved to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval { program, data } => cmd_eval(&program, &data),
        Commands::Display { program, format } => cmd_display(&program, &format),
        Commands::Params { config } => cmd_params(config.as_deref()),
        Commands::Fit {
            library,
            data,
            target,
            config,
            output,
        } => cmd_fit(&library, &data, &target, config.as_deref(), output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
