use std::{collections::BTreeSet, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vofo::{
    ResourceKind,
    alerts::{AlertDispatcher, Dispatcher},
    config::{Config, install_config, installed_config_path, load_config, read_config_file},
    heal::heal,
    monitors::{group::MonitorGroup, resource::ResourceMonitor},
    sampler::sampler_for,
};

/// A lightweight, cloud-agnostic monitoring and auto-healing tool
#[derive(Debug, Parser)]
#[command(name = "vofo", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize with a config file, installed to ~/.vofo/config.json
    #[command(alias = "initialize")]
    Init {
        config_path: PathBuf,

        /// Skip the interactive confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Start the agent with the given modules (defaults to monitor)
    #[command(alias = "s")]
    Start(StartArgs),

    /// Monitor system resources (cpu, disk, mem) or all if none specified
    Monitor(MonitorArgs),
}

#[derive(Debug, Args)]
struct StartArgs {
    /// Start all modules
    #[arg(short = 'A', long, group = "mode")]
    all: bool,

    /// Start monitor module
    #[arg(short = 'M', long, group = "mode")]
    monitor: bool,

    /// Start heal module
    #[arg(short = 'H', long, group = "mode")]
    heal: bool,

    #[command(flatten)]
    config: ConfigArg,
}

#[derive(Debug, Args)]
struct MonitorArgs {
    /// Resources to monitor
    resources: Vec<ResourceKind>,

    /// Monitor all resources (cpu, disk, mem)
    #[arg(short = 'A', long)]
    all: bool,

    #[command(flatten)]
    config: ConfigArg,
}

#[derive(Debug, Args)]
struct ConfigArg {
    /// Config file to use instead of the initialized one
    #[arg(short = 'c', long = "config", env = "VOFO_CONFIG")]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    All,
    Monitor,
    Heal,
}

fn init(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![("vofo", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init(cli.verbose);
    trace!("started with args: {cli:?}");

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init { config_path, yes } => initialize(config_path, yes),
        Command::Start(args) => {
            let state = if args.all {
                State::All
            } else if args.heal {
                State::Heal
            } else {
                State::Monitor
            };
            info!("running start command with state: {state:?}");

            let config = load_config(args.config.path.as_deref(), &installed_config_path())?;
            if matches!(state, State::All | State::Heal) {
                heal(&config)?;
            }
            if matches!(state, State::All | State::Monitor) {
                monitor(&config, ResourceKind::ALL.into()).await?;
            }
            Ok(())
        }
        Command::Monitor(args) => {
            let resources: BTreeSet<ResourceKind> = if args.all || args.resources.is_empty() {
                ResourceKind::ALL.into()
            } else {
                args.resources.into_iter().collect()
            };
            info!("running monitor command with resources: {resources:?}");

            let config = load_config(args.config.path.as_deref(), &installed_config_path())?;
            monitor(&config, resources).await
        }
    }
}

fn initialize(path: PathBuf, yes: bool) -> anyhow::Result<()> {
    info!("running init command with config: {}", path.display());
    let config = read_config_file(&path)?;
    summarize(&config);

    if !yes {
        info!("Please check your config settings for the machine and confirm");
        let answer: String = dialoguer::Input::new()
            .with_prompt("Only [YES] is allowed")
            .interact_text()
            .context("failed to read confirmation")?;
        if !answer.trim().eq_ignore_ascii_case("yes") {
            bail!("Only [YES] is allowed. Exiting...");
        }
    }

    let installed = installed_config_path();
    install_config(&config, &installed)?;
    info!(
        "initialized your machine with {} (installed at {})",
        path.display(),
        installed.display()
    );
    Ok(())
}

fn summarize(config: &Config) {
    for kind in ResourceKind::ALL {
        info!("{kind} threshold: {:.2}%", config.threshold(kind));
    }
    info!("sample interval: {}s", config.interval);
    info!("alert grace period: {}s", config.alert_threshold);
    info!("alert method: {}", config.alert_method);
}

async fn monitor(config: &Config, resources: BTreeSet<ResourceKind>) -> anyhow::Result<()> {
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(AlertDispatcher::from_env().context("failed to build alert HTTP client")?);
    let channel = Arc::new(config.alert_channel());

    let cancel = CancellationToken::new();
    let mut group = MonitorGroup::new(cancel.clone());
    for kind in resources {
        group.spawn(ResourceMonitor::new(
            sampler_for(kind, config)?,
            config.thresholds(kind)?,
            channel.clone(),
            dispatcher.clone(),
        ));
    }

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, stopping monitors");
            cancel.cancel();
        }
    });

    let result = group.join().await;
    watcher.abort();
    Ok(result?)
}
