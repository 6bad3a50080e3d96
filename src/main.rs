mod api;
mod cli;
mod config;
mod error;
mod hazard;
mod models;
mod pipeline;
mod registry;

use clap::Parser;
use cli::{App, Cli, Commands};
use colored::*;
use config::Settings;
use dialoguer::{theme::ColorfulTheme, Select};
use error::Result;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr, or to a daily rolling file when `HAZARD_LOG_DIR` is set
/// so the live table is not interleaved with log lines.
fn init_logging(settings: &Settings) -> Option<WorkerGuard> {
    match &settings.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "hazard-monitor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        },
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
            None
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "Error: invalid configuration:".red(), e);
            return Err(e);
        },
    };
    let _log_guard = init_logging(&settings);

    info!("Initializing hazard monitor...");
    let app = App::new(settings)?;
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        return app.run_command(command).await.map_err(|e| {
            error!("Command execution failed: {:?}", e);
            e
        });
    }

    println!("{}", "Welcome to the Live Hazard Monitor!".cyan().bold());

    // Main interactive loop
    loop {
        let options = &[
            "Fetch Snapshot Once",
            "Start Live Monitor (Ctrl+C to return)",
            "List Monitored Points",
            "Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact_opt()? // None when the prompt is cancelled
            .unwrap_or(options.len() - 1);

        println!("\n---\n");

        let command_result = match selection {
            0 => match cli::prompt_json() {
                Ok(json) => app.run_command(Commands::Once { json }).await,
                Err(e) => {
                    println!("{} {}", "Failed to get input:".red(), e);
                    continue;
                },
            },
            1 => app.run_command(Commands::Watch).await,
            2 => app.run_command(Commands::Points).await,
            3 => {
                println!("{}", "Exiting. Stay safe!".green());
                break;
            },
            _ => unreachable!(),
        };

        if let Err(e) = command_result {
            error!("Command execution failed: {:?}", e);
            println!(
                "{} {}",
                "Error executing command:".red(),
                e.to_string().red()
            );
        }

        println!("\n---\n");
    }

    Ok(())
}
