//! kmsort CLI - canonical field ordering for Kubernetes manifests.

use clap::{Parser, Subcommand};
use kmsort_canonical::PolicyRegistry;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod path;

use commands::{canonicalize, serve, sort};

#[derive(Parser)]
#[command(name = "kmsort")]
#[command(about = "Sort Kubernetes manifests into a canonical field order")]
struct Cli {
    /// Policy overlay (YAML or JSON) extending the built-in ordering tables
    #[arg(long, global = true, env = "KMSORT_POLICY")]
    policy: Option<PathBuf>,
    /// Log filter, e.g. `info` or `kmsort_canonical=trace`
    #[arg(long, global = true, env = "KMSORT_LOG", default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize a manifest stream and print it
    Canonicalize {
        /// Input file (or stdin if not provided)
        input: Option<PathBuf>,
    },
    /// Canonicalize a file or every file below a directory
    Sort {
        /// File or directory to process
        path: PathBuf,
        /// Directory receiving the mirrored output tree
        #[arg(long, default_value = "new")]
        out_dir: PathBuf,
        /// Keep failing documents unchanged and continue with the rest
        #[arg(long)]
        keep_going: bool,
        /// Print the per-file report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the web form and the render endpoint
    Serve {
        /// Address to listen on
        #[arg(long, env = "KMSORT_ADDR", default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_registry(policy: Option<PathBuf>) -> Result<PolicyRegistry, Box<dyn std::error::Error>> {
    match policy {
        Some(path) => PolicyRegistry::from_overlay_file(&path)
            .map_err(|e| format!("Failed to load policy {}: {}", path.display(), e).into()),
        None => Ok(PolicyRegistry::builtin()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = load_registry(cli.policy).and_then(|registry| match cli.command {
        Commands::Canonicalize { input } => canonicalize::run(&registry, input),
        Commands::Sort {
            path,
            out_dir,
            keep_going,
            json,
        } => sort::run(&registry, path, out_dir, keep_going, json),
        Commands::Serve { addr } => serve::run(registry, addr),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
