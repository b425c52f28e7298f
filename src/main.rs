use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floodscope::config::Config;
use floodscope::control::{Command, Controller, Event, Session, Status, parse_command};
use floodscope::engine::{LocalEngine, compute_with_retry};
use floodscope::layers::{MapDisplay, TiffMap, legend};
use floodscope::pipeline::FloodPipeline;

#[derive(Parser, Debug)]
#[command(name = "floodscope")]
#[command(about = "Seasonal flood and permanent water maps")]
struct Args {
    /// Log filter, e.g. "info" or "floodscope=debug"
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute one layer and write it to the output directory
    Render {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        year: i32,
        #[arg(short, long, default_value = "Permanent Water")]
        layer: String,
    },
    /// Interactive session reading `year <n>`, `layer <name>`, `next` and
    /// `quit` from stdin
    Watch {
        #[arg(short, long)]
        config: PathBuf,
        /// Do not step through the years automatically
        #[arg(long)]
        no_auto_advance: bool,
    },
    /// Print the map legend
    Legend,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match args.command {
        Commands::Render {
            config,
            year,
            layer,
        } => runtime.block_on(render(&config, year, layer)),
        Commands::Watch {
            config,
            no_auto_advance,
        } => runtime.block_on(watch(&config, !no_auto_advance)),
        Commands::Legend => {
            print_legend();
            Ok(())
        }
    }
}

fn print_legend() {
    println!("Legend");
    for entry in legend() {
        println!("  {:<8} {}", entry.color, entry.label);
    }
}

fn load(path: &Path) -> Result<(Config, FloodPipeline)> {
    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    let pipeline = FloodPipeline::open(&config).context("Failed to set up flood pipeline")?;
    info!(pipeline = %pipeline, years = ?config.years(), "loaded configuration");

    Ok((config, pipeline))
}

async fn render(path: &Path, year: i32, layer: String) -> Result<()> {
    let (config, pipeline) = load(path)?;

    let mut controller = Controller::new(config.years());
    controller.handle(Event::Slider(f64::from(year)));
    let state = controller.handle(Event::Dropdown(layer));
    if state.year != year {
        warn!(requested = year, year = state.year, "year outside configured range, clamped");
    }

    let engine = LocalEngine::new(pipeline);
    let mut map = TiffMap::new(config.output_directory())?;

    match compute_with_retry(&engine, &state, config.retry()).await? {
        Some(layer) => {
            println!("{}: {}", layer.name, layer.content.summary());
            map.replace(vec![layer])?;
            for path in map.written() {
                println!("wrote {}", path.display());
            }
        }
        None => warn!(layer = %state.layer, "unknown layer, nothing rendered"),
    }

    Ok(())
}

async fn watch(path: &Path, auto_advance: bool) -> Result<()> {
    let (config, pipeline) = load(path)?;
    print_legend();

    let map = TiffMap::new(config.output_directory())?;
    let session = Session::new(
        Arc::new(LocalEngine::new(pipeline)),
        Controller::new(config.years()),
        map,
        config.retry(),
    );

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Some(Command::Event(event)) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Some(Command::Quit) => break,
                None if line.trim().is_empty() => {}
                None => warn!(input = %line, "unrecognised command"),
            }
        }
    });

    let period = auto_advance.then(|| config.auto_advance());
    let session = session.run(rx, period).await;

    match session.status() {
        Status::Failed { state, reason } => warn!(state = %state, reason = %reason, "last layer failed"),
        _ => info!(state = %session.state(), "session finished"),
    }

    Ok(())
}
