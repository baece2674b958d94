use clap::{Parser, Subcommand};
use leia_testenv::cli::{self, Target};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "leia-env")]
#[command(about = "Docker Compose test environment for leia", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory containing the compose file
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Compose file to use instead of docker-compose-kafka-cluster.yaml
    #[arg(long, global = true)]
    compose: Option<PathBuf>,

    /// Run the host's compose binary instead of the compose image
    #[arg(long, global = true)]
    local_compose: bool,

    /// Compose project name
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the compose file declares every exposed service and port
    Validate,
    /// Start the environment and wait until exposed ports are reachable
    Up,
    /// Stop and remove the environment
    Down,
    /// Show container status
    Ps,
    /// Show host endpoints of exposed services
    Ports {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show container logs
    Logs {
        /// Only this service
        service: Option<String>,
        /// Keep streaming
        #[arg(short, long)]
        follow: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leia_testenv=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let target = Target {
        dir: cli.dir,
        compose: cli.compose,
        local_compose: cli.local_compose,
        project: cli.project,
    };

    match cli.command {
        Commands::Validate => cli::validate::run(&target)?,
        Commands::Up => cli::docker::up(&target)?,
        Commands::Down => cli::docker::down(&target)?,
        Commands::Ps => cli::docker::ps(&target)?,
        Commands::Ports { json } => cli::ports::list(&target, json)?,
        Commands::Logs { service, follow } => cli::docker::logs(&target, service, follow)?,
    }

    Ok(())
}
