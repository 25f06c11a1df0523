use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use clinic_records::{persistence, reporting, Config, EntityStore, Menu, PatientId};

#[derive(Debug, Parser)]
#[command(name = "clinic-records", version, about = "Clinic patient and doctor records")]
struct Cli {
    /// Patient data file
    #[arg(
        long,
        global = true,
        env = "CLINIC_DATA_FILE",
        default_value = persistence::DEFAULT_DATA_FILE
    )]
    data: PathBuf,

    /// Keep appointment text across save/load
    #[arg(long, global = true, env = "CLINIC_PERSIST_APPOINTMENTS")]
    persist_appointments: bool,

    /// Save automatically when leaving the menu
    #[arg(long, global = true)]
    save_on_exit: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive numbered menu (default)
    Menu,
    /// Print aggregate statistics for the data file
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Print one patient
    Show {
        id: u32,
        #[arg(long)]
        json: bool,
    },
    /// Write every patient as CSV
    ExportCsv { out: PathBuf },
    /// Verify the data file and print its header
    Inspect,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::default()
        .with_data_file(&cli.data)
        .with_appointments_persisted(cli.persist_appointments)
        .with_save_on_exit(cli.save_on_exit);

    match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => {
            let mut store = EntityStore::new();
            let mut config = config;
            match persistence::load(&mut store, &config.data_file, config.persist) {
                Ok(0) => println!("No saved patients found. Starting fresh."),
                Ok(loaded) => println!("Data loaded successfully. {} patients found.", loaded),
                Err(err) => {
                    // Keep the unreadable file intact for inspection
                    warn!(error = %err, "data file could not be loaded, saving disabled");
                    println!("Error loading data: {}", err);
                    println!("Starting with an empty store; saving is disabled for this session.");
                    config = config.with_read_only(true);
                }
            }
            let stdin = io::stdin();
            let stdout = io::stdout();
            Menu::new(&mut store, &config, stdin.lock(), stdout.lock())
                .run()
                .context("console I/O failed")?;
        }
        Command::Stats { json } => {
            let (store, _) = load_store(&config)?;
            let stats = reporting::statistics(&store);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats);
            }
        }
        Command::Show { id, json } => {
            let (store, _) = load_store(&config)?;
            let info = reporting::patient_info(store.find_patient(PatientId(id))?);
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print!("{}", info);
            }
        }
        Command::ExportCsv { out } => {
            let (store, _) = load_store(&config)?;
            let file = File::create(&out)
                .with_context(|| format!("creating {}", out.display()))?;
            let mut writer = BufWriter::new(file);
            let rows = reporting::export_csv(&store, &mut writer)?;
            writer.flush()?;
            println!("✓ Exported {} patients to {}", rows, out.display());
        }
        Command::Inspect => {
            let summary = persistence::inspect(&config.data_file)
                .with_context(|| format!("inspecting {}", config.data_file.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn load_store(config: &Config) -> Result<(EntityStore, usize)> {
    let mut store = EntityStore::new();
    let loaded = persistence::load(&mut store, &config.data_file, config.persist)
        .with_context(|| format!("loading {}", config.data_file.display()))?;
    Ok((store, loaded))
}

/// Logs go to stderr so they never interleave with menu output on stdout.
/// `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
