mod config;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use config::{Config, DEFAULT_CONFIG_FILE};
use filter_store::ArtifactStore;
use image_filter::{FilterDispatcher, OutputFormat};
use std::{fs, path::PathBuf};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(version, about = "Apply image filters and keep originals next to their results")]
struct Cli {
    /// Configuration file, created with defaults when missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Store directory, overrides `[store] root`
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available filters
    Filters,

    /// Filter a file without touching the store
    Apply {
        #[arg(short, long)]
        filter: String,

        #[arg(short, long)]
        input: PathBuf,

        /// Output file; `.png` or `.jpg` picks the format
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Store an original, optionally filtering it right away
    Upload {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Filter a stored original
    Filter {
        #[arg(long)]
        id: Uuid,

        #[arg(short, long)]
        filter: String,
    },

    /// Show every filtered image derived from an original
    History {
        #[arg(long)]
        id: Uuid,
    },
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    if config.is_first_run {
        log::info!("wrote default config to {}", config.config_path.display());
    }

    let catalog = config.catalog()?;
    let dispatcher = FilterDispatcher::new(&catalog);
    let store_root = cli.store.unwrap_or_else(|| PathBuf::from(&config.store.root));

    match cli.command {
        Command::Filters => {
            for identifier in catalog.identifiers() {
                println!("{identifier}");
            }
        }

        Command::Apply {
            filter,
            input,
            output,
        } => {
            let mut pipeline = config.pipeline()?;
            if let Some(ext) = output.extension().and_then(|ext| ext.to_str()) {
                match OutputFormat::from_extension(ext) {
                    Some(format) => pipeline = pipeline.with_output_format(format),
                    None => bail!("unsupported output extension `{ext}`"),
                }
            }

            let bytes = fs::read(&input).with_context(|| format!("read {}", input.display()))?;
            let result = pipeline.run_with(&dispatcher, &filter, &bytes)?;
            fs::write(&output, &result.bytes)
                .with_context(|| format!("write {}", output.display()))?;

            log::info!(
                "`{}` {}x{} -> {}",
                result.filter,
                result.width,
                result.height,
                output.display()
            );
        }

        Command::Upload { input, filter } => {
            let store = ArtifactStore::open(&store_root)?;
            let bytes = fs::read(&input).with_context(|| format!("read {}", input.display()))?;

            match filter {
                Some(filter) => {
                    let (entered, filtered) = store.upload_and_filter_with(
                        &dispatcher,
                        &bytes,
                        &filter,
                        &config.pipeline()?,
                    )?;
                    println!("{}", serde_json::to_string_pretty(&(entered, filtered))?);
                }
                None => {
                    let entered = store.save_entered(&bytes)?;
                    println!("{}", serde_json::to_string_pretty(&entered)?);
                }
            }
        }

        Command::Filter { id, filter } => {
            let store = ArtifactStore::open(&store_root)?;
            let filtered = store.apply_filter_with(&dispatcher, id, &filter, &config.pipeline()?)?;
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }

        Command::History { id } => {
            let store = ArtifactStore::open(&store_root)?;
            let entered = store.entered(id)?;
            let filtered = store.filtered_for(id)?;
            println!("{}", serde_json::to_string_pretty(&(entered, filtered))?);
        }
    }

    Ok(())
}

fn init_logger() {
    use std::io::Write;

    env_logger::builder()
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let ts = chrono::Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "[{} {style}{}{style:#} {} {}] {}",
                ts,
                record.level(),
                record
                    .file()
                    .unwrap_or("None")
                    .split('/')
                    .next_back()
                    .unwrap_or("None"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
