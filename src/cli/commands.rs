use crate::api::{OpenMeteoClient, RiverLevelProbe};
use crate::cli::display::{PresentationSurface, TerminalSurface};
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::AggregateSnapshot;
use crate::pipeline::{RefreshScheduler, SnapshotAggregator, SnapshotReceiver};
use crate::registry::GeoPointRegistry;
use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// The production aggregator: Open-Meteo per point plus the river fallback chain.
pub type LiveAggregator = SnapshotAggregator<OpenMeteoClient, RiverLevelProbe>;

/// Live landslide, rainfall and air quality hazard monitor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run without a subcommand for the interactive menu
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Fetch every point once and print the snapshot
    Once {
        /// Print the snapshot as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Render a snapshot now, then refresh it every three minutes until Ctrl+C
    Watch,

    /// List the monitored points
    Points,
}

/// CLI application
pub struct App {
    settings: Settings,
    registry: GeoPointRegistry,
}

impl App {
    /// Create a new CLI application over the given settings and the built-in point set.
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self {
            settings,
            registry: GeoPointRegistry::darjeeling()?,
        })
    }

    fn build_aggregator(&self) -> Result<LiveAggregator> {
        let environment = OpenMeteoClient::new(&self.settings)?;
        let river = RiverLevelProbe::new(&self.settings)?;
        Ok(SnapshotAggregator::new(
            self.registry.clone(),
            environment,
            river,
            &self.settings,
        ))
    }

    /// Run a single command
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        info!("Running command {:?}", command);
        match command {
            Commands::Once { json } => self.fetch_once(json).await,
            Commands::Watch => self.watch().await,
            Commands::Points => {
                self.list_points();
                Ok(())
            },
        }
    }

    /// Fetch one snapshot and print it
    async fn fetch_once(&self, json: bool) -> Result<()> {
        let aggregator = self.build_aggregator()?;

        let spinner = fetch_spinner(aggregator.registry().len())?;
        let snapshot = aggregator.aggregate().await;
        spinner.finish_and_clear();

        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            let mut surface = TerminalSurface::new(false);
            present(&mut surface, &snapshot)?;
        }
        Ok(())
    }

    /// Initial render in the foreground, then one background scheduler feeding re-renders
    async fn watch(&self) -> Result<()> {
        let aggregator = self.build_aggregator()?;
        let (mut scheduler, receiver) =
            RefreshScheduler::new(aggregator, self.settings.refresh_interval);
        let mut surface = TerminalSurface::new(true);

        let spinner = fetch_spinner(self.registry.len())?;
        let initial = scheduler.tick().await;
        spinner.finish_and_clear();
        match initial {
            Ok(snapshot) => present(&mut surface, &snapshot)?,
            Err(e) => {
                // Keep going: the scheduler will try again on the next tick.
                error!("Initial fetch failed: {}", e);
                println!("{} {}", "Initial fetch failed:".red(), e);
            },
        }

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(scheduler.run(async move {
            let _ = stopped.await;
        }));
        let outcome = render_updates(receiver, &mut surface).await;

        // Stopping through the scheduler aborts a tick that is still fetching.
        let _ = stop.send(());
        match handle.await {
            Ok(scheduler) => {
                info!(
                    "Live monitor stopped in state {:?} after {} renders, {} failed ticks",
                    scheduler.state(),
                    surface.renders(),
                    scheduler.failed_ticks()
                );
                if let Some(last) = scheduler.latest() {
                    println!("Last update: {}", last.updated_label());
                }
            },
            Err(e) => error!("Refresh scheduler task failed: {}", e),
        }
        println!("{}", "Live monitor stopped.".green());
        outcome
    }

    fn list_points(&self) {
        if self.registry.is_empty() {
            println!("{}", "No points are monitored.".yellow());
            return;
        }
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["#", "Point", "Latitude", "Longitude"]);
        for (i, point) in self.registry.points().iter().enumerate() {
            table.add_row(vec![
                (i + 1).to_string(),
                point.name.clone(),
                format!("{:.4}", point.lat),
                format!("{:.4}", point.lon),
            ]);
        }
        println!("{}", table);
        println!(
            "River watched: {} (timezone {})",
            self.settings.river_name, self.settings.timezone
        );
    }
}

/// Hands a snapshot to a surface with its derived labels.
pub fn present(surface: &mut impl PresentationSurface, snapshot: &AggregateSnapshot) -> Result<()> {
    surface.render(snapshot, &snapshot.updated_label(), &snapshot.river.summary())
}

/// Re-renders on every publication until Ctrl+C or until the scheduler goes away.
async fn render_updates(
    mut receiver: SnapshotReceiver,
    surface: &mut impl PresentationSurface,
) -> Result<()> {
    loop {
        tokio::select! {
            changed = receiver.changed() => {
                if changed.is_err() {
                    warn!("Refresh scheduler stopped publishing");
                    return Err(AppError::Cli("refresh scheduler stopped".to_string()));
                }
                let latest = receiver.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    present(surface, &snapshot)?;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Interrupted, leaving live monitor");
                return Ok(());
            },
        }
    }
}

fn fetch_spinner(points: usize) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Fetching {} points and the river level...", points));
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

/// Ask whether a one-off snapshot should be printed as JSON
pub fn prompt_json() -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Print the snapshot as JSON?")
        .default(false)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, PointSnapshot, RiverLevelReading, RiverStatus};
    use chrono::{FixedOffset, TimeZone};
    use std::sync::Arc;
    use tokio::sync::watch;

    #[derive(Default)]
    struct RecordingSurface {
        rendered: Vec<(String, String, usize)>,
    }

    impl PresentationSurface for RecordingSurface {
        fn render(
            &mut self,
            snapshot: &AggregateSnapshot,
            updated_label: &str,
            river_summary: &str,
        ) -> Result<()> {
            self.rendered.push((
                updated_label.to_string(),
                river_summary.to_string(),
                snapshot.points.len(),
            ));
            Ok(())
        }
    }

    fn snapshot(minute: u32) -> AggregateSnapshot {
        AggregateSnapshot {
            timestamp: FixedOffset::east_opt(330 * 60)
                .unwrap()
                .with_ymd_and_hms(2024, 7, 14, 9, minute, 0)
                .unwrap(),
            points: vec![PointSnapshot::failed(
                GeoPoint::new("Sonada", 26.9607, 88.2960),
                "timeout".to_string(),
            )],
            river: RiverLevelReading {
                value: Some(180.0),
                unit_label: Some("cm".to_string()),
                status: RiverStatus::Normal,
            },
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["hazard-monitor", "once", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Once { json: true }));

        let cli = Cli::try_parse_from(["hazard-monitor", "watch"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Watch));

        let cli = Cli::try_parse_from(["hazard-monitor"]).unwrap();
        assert_eq!(cli.command, None);

        assert!(Cli::try_parse_from(["hazard-monitor", "purge"]).is_err());
    }

    #[test]
    fn test_present_passes_derived_labels() {
        let mut surface = RecordingSurface::default();
        present(&mut surface, &snapshot(3)).unwrap();
        assert_eq!(
            surface.rendered,
            vec![("2024-07-14 09:03".to_string(), "180 cm - NORMAL".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_render_updates_stops_when_publisher_dropped() {
        let (publisher, receiver) = watch::channel(None);
        publisher.send_replace(Some(Arc::new(snapshot(6))));
        drop(publisher);

        let mut surface = RecordingSurface::default();
        let result = render_updates(receiver, &mut surface).await;

        // The value sent before the drop is still rendered once.
        assert_eq!(surface.rendered.len(), 1);
        assert_eq!(surface.rendered[0].0, "2024-07-14 09:06");
        assert!(matches!(result, Err(AppError::Cli(_))));
    }

    #[test]
    fn test_app_builds_live_aggregator() {
        let app = App::new(Settings::default()).unwrap();
        let aggregator = app.build_aggregator().unwrap();
        assert_eq!(aggregator.registry().len(), 14);
        assert_eq!(app.settings.river_name, "Teesta");
    }
}
