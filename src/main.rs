use allayplots_core::config::PluginConfig;
use allayplots_core::generator::GeneratorPreset;
use allayplots_save_data::{StorageKind, WorldRecords, open_storage};
use allayplots_text::legacy_to_ansi;
use anyhow::{Context, bail};
use backtrace::Backtrace;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Maintenance tool for AllayPlots data folders.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The plugin data folder holding config.yml and the plot data.
    #[arg(long, default_value = "./plugins/AllayPlots")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints how many plots are claimed in each world.
    Summary,
    /// Copies all plots from the configured storage into another backend.
    Migrate {
        #[arg(long)]
        to: StorageKind,
    },
    /// Prints the generator preset of a configured plot world.
    Preset { world: String },
}

fn main() {
    // Setup logging
    let logfile = tracing_appender::rolling::daily("./logs", "allayplots.log");
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("ALLAYPLOTS_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_writer(logfile.and(std::io::stdout))
        .with_env_filter(env_filter)
        .init();

    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = Backtrace::new();
        error!("{}\n{:?}", panic_info, backtrace);
    }));

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{:?}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PluginConfig::read(&cli.data_dir)
        .with_context(|| format!("failed to load config from {}", cli.data_dir.display()))?;
    match cli.command {
        Command::Summary => summary(&cli.data_dir, &config),
        Command::Migrate { to } => migrate(&cli.data_dir, &config, to),
        Command::Preset { world } => {
            let Some(world_config) = config.world(&world) else {
                bail!("{} is not a configured plot world", world);
            };
            println!("{}", GeneratorPreset::from_config(world_config));
            Ok(())
        }
    }
}

fn load_records(data_dir: &Path, config: &PluginConfig, kind: StorageKind) -> anyhow::Result<WorldRecords> {
    let mut storage = open_storage(kind, data_dir, &config.storage.mysql)
        .with_context(|| format!("failed to open {} storage", kind))?;
    storage
        .load()
        .with_context(|| format!("failed to load plots from {}", storage.name()))
}

fn summary(data_dir: &Path, config: &PluginConfig) -> anyhow::Result<()> {
    let kind = config.storage.storage_kind();
    let worlds = load_records(data_dir, config, kind)?;
    println!("{}", legacy_to_ansi(&format!("&7Storage: &f{}", kind)));
    for name in config.worlds.keys() {
        let plots = worlds.get(name);
        let claimed = plots.map_or(0, |plots| plots.values().filter(|r| r.owner.is_some()).count());
        let owners: BTreeSet<u128> = plots
            .into_iter()
            .flat_map(|plots| plots.values().filter_map(|r| r.owner))
            .collect();
        println!(
            "{}",
            legacy_to_ansi(&format!(
                "&e{}&7: &f{} &7claimed plots, &f{} &7owners",
                name,
                claimed,
                owners.len()
            ))
        );
    }
    for (name, plots) in &worlds {
        if !config.worlds.contains_key(name) {
            println!(
                "{}",
                legacy_to_ansi(&format!(
                    "&c{}&7: &f{} &7stored plots (world not configured)",
                    name,
                    plots.len()
                ))
            );
        }
    }
    Ok(())
}

fn migrate(data_dir: &Path, config: &PluginConfig, to: StorageKind) -> anyhow::Result<()> {
    let from = config.storage.storage_kind();
    if from == to {
        bail!("plots are already stored in {}", to);
    }
    let worlds = load_records(data_dir, config, from)?;
    let mut target = open_storage(to, data_dir, &config.storage.mysql)
        .with_context(|| format!("failed to open {} storage", to))?;
    target
        .save(&worlds)
        .with_context(|| format!("failed to write plots to {}", target.name()))?;
    let count: usize = worlds.values().map(|plots| plots.len()).sum();
    info!(
        "Copied {} plots from {} to {}. Set storage.type to {} in config.yml to use it.",
        count, from, to, to
    );
    Ok(())
}
