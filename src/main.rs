use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use translation_audit::{protocol, server, App, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "translation-audit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen for HTTP triggers (default)
    Serve {
        /// Address to bind, defaults to 0.0.0.0:$PORT
        #[arg(long)]
        bind: Option<String>,
    },
    /// Scan one space, write the report and email it, then exit
    Run {
        #[arg(long)]
        space_id: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let app = match AppConfig::from_env().and_then(App::new) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| format!("0.0.0.0:{}", app.config.port));
            server::serve(&app, &addr)
        }
        Commands::Run { space_id } => protocol::run_job(&app, &space_id).map(|summary| {
            info!(rows = summary.rows, path = %summary.report_path.display(), "done");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "exiting with failure");
            ExitCode::FAILURE
        }
    }
}
