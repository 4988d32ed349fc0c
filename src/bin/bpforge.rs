use anyhow::{Context, Result, bail};
use blueprint_forge::api::{self, AppState};
use blueprint_forge::compiler::loader;
use blueprint_forge::compiler::validator::{Issue, Validator};
use blueprint_forge::config::{LoggingConfig, Settings, StorageConfig};
use blueprint_forge::plugins::{PluginRegistry, PortDirection};
use blueprint_forge::runtime::engine::Orchestrator;
use blueprint_forge::runtime::run::LogLevel;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Blueprint to repository generator", long_about = None)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, short, global = true, env = "BPFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a blueprint and print every issue
    Validate {
        /// Blueprint file (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Generate a repository from a blueprint
    Generate {
        /// Blueprint file (.json, .yaml or .yml)
        file: PathBuf,

        /// Output directory
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Re-export a blueprint, converting by file extension
    Export {
        /// Blueprint file (.json, .yaml or .yml)
        file: PathBuf,

        /// Destination file
        #[arg(long, short)]
        out: PathBuf,
    },

    /// List registered plugins
    Plugins,

    /// Start the HTTP API
    Serve {
        /// Listen address, overriding the settings file
        #[arg(long, env = "BPFORGE_LISTEN")]
        listen: Option<SocketAddr>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn print_issues(label: &str, issues: &[Issue]) {
    for issue in issues {
        let node = issue.node_id.as_deref().map(|id| format!(" (node {})", id)).unwrap_or_default();
        let path = if issue.path.is_empty() { "<root>" } else { issue.path.as_str() };
        println!("{} [{}] {}: {}{}", label, issue.code.as_str(), path, issue.message, node);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    init_tracing(&settings.logging);

    let registry = Arc::new(PluginRegistry::with_builtins());

    match cli.command {
        Commands::Validate { file } => {
            let raw = loader::load_value(&file)?;
            let (result, _) = Validator::new(&registry).validate_value(&raw);
            print_issues("error", &result.errors);
            print_issues("warning", &result.warnings);
            if !result.valid {
                bail!("{} is invalid: {} error(s)", file.display(), result.errors.len());
            }
            println!("{} is valid ({} warning(s))", file.display(), result.warnings.len());
        }

        Commands::Generate { file, out } => {
            let blueprint = loader::load_blueprint(&file)?;
            info!(blueprint_id = %blueprint.id, nodes = blueprint.nodes.len(), "Loaded blueprint");

            let orchestrator = Orchestrator::new(registry, StorageConfig::Memory.open()?).with_config(settings.engine.clone());
            let outcome = orchestrator.generate(&blueprint).await?;

            for entry in outcome.run.logs.iter().filter(|l| l.level >= LogLevel::Warn) {
                println!("{:?}: {}", entry.level, entry.message);
            }
            let Some(repository) = outcome.repository else {
                bail!(
                    "run {} ended {}: {}",
                    outcome.run.id,
                    outcome.run.status,
                    outcome.run.error.as_deref().unwrap_or("no error recorded")
                );
            };

            repository
                .write_to(&out)
                .with_context(|| format!("Failed to write repository to {}", out.display()))?;
            println!("Wrote {} file(s) to {}", repository.files.len(), out.display());
        }

        Commands::Export { file, out } => {
            let blueprint = loader::load_blueprint(&file)?;
            loader::save_blueprint(&blueprint, &out)?;
            println!("Exported {} to {}", blueprint.id, out.display());
        }

        Commands::Plugins => {
            for plugin in registry.list() {
                let meta = plugin.metadata();
                println!("{:<18} {} v{}  {}", plugin.node_type().as_str(), meta.name, meta.version, meta.description);
                for port in plugin.ports() {
                    let direction = match port.direction {
                        PortDirection::Input => "in ",
                        PortDirection::Output => "out",
                    };
                    let required = if port.required { " (required)" } else { "" };
                    println!("    {} {:<10} {}{}", direction, port.id, port.data_type, required);
                }
            }
        }

        Commands::Serve { listen } => {
            let store = settings.storage.open()?;
            let orchestrator = Arc::new(Orchestrator::new(registry, store).with_config(settings.engine.clone()));
            let state = AppState::new(orchestrator).with_cors(settings.server.enable_cors);
            let addr = listen.unwrap_or(settings.server.listen_addr);
            api::serve(state, addr).await.context("API server failed")?;
        }
    }

    Ok(())
}
