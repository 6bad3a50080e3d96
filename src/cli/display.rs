//! Terminal presentation of published snapshots.
//!
//! The pipeline never depends on how a snapshot is rendered. Anything that can
//! take a finished snapshot, its "last updated" label and the river summary can
//! act as a `PresentationSurface`.

use crate::error::Result;
use crate::models::{AggregateSnapshot, HazardLabel, PointSnapshot};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

/// Consumer of completed snapshots.
pub trait PresentationSurface {
    fn render(
        &mut self,
        snapshot: &AggregateSnapshot,
        updated_label: &str,
        river_summary: &str,
    ) -> Result<()>;
}

/// Colour of a point's map marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    DarkRed,
    Red,
    Orange,
    Blue,
    Green,
}

impl MarkerColor {
    fn paint(self, text: &str) -> ColoredString {
        match self {
            MarkerColor::DarkRed => text.truecolor(139, 0, 0).bold(),
            MarkerColor::Red => text.red().bold(),
            MarkerColor::Orange => text.truecolor(255, 140, 0),
            MarkerColor::Blue => text.blue(),
            MarkerColor::Green => text.green(),
        }
    }
}

/// Landslide label wins; heavy current rain shows as blue otherwise.
pub fn marker_color(point: &PointSnapshot) -> MarkerColor {
    match point.hazard.landslide_label {
        HazardLabel::Confirm => MarkerColor::DarkRed,
        HazardLabel::High => MarkerColor::Red,
        HazardLabel::Mid => MarkerColor::Orange,
        HazardLabel::No if point.precip_now() >= 5.0 => MarkerColor::Blue,
        HazardLabel::No => MarkerColor::Green,
    }
}

// --- Display de-duplication ---

const EARTH_RADIUS_KM: f64 = 6371.0;
/// Points closer than this to an already placed marker are shifted.
const MIN_MARKER_SEPARATION_KM: f64 = 0.4;
const SHIFT_LAT: f64 = 0.0015;
const SHIFT_LON: f64 = 0.0025;

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Display coordinates for every point, shifted so nearly coincident markers
/// do not overlap. The snapshot's `GeoPoint`s are left untouched.
pub fn display_positions(snapshot: &AggregateSnapshot) -> Vec<(f64, f64)> {
    let mut placed: Vec<(f64, f64)> = Vec::with_capacity(snapshot.points.len());
    for entry in &snapshot.points {
        let (mut lat, mut lon) = (entry.point.lat, entry.point.lon);
        for &(plat, plon) in &placed {
            if haversine_km(lat, lon, plat, plon) < MIN_MARKER_SEPARATION_KM {
                lat += SHIFT_LAT;
                lon += SHIFT_LON;
            }
        }
        placed.push((lat, lon));
    }
    placed
}

// --- Table rendering ---

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "-".to_string(),
    }
}

/// Builds the snapshot table without printing it.
pub fn snapshot_table(snapshot: &AggregateSnapshot) -> Table {
    let positions = display_positions(snapshot);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Point", "Lat", "Lon", "Temp", "Humidity", "Rain", "Landslide", "Rainfall", "PM2.5",
            "PM10", "AQI",
        ]);

    for (entry, (lat, lon)) in snapshot.points.iter().zip(positions) {
        let color = marker_color(entry);
        let weather = entry.weather.clone().unwrap_or_default();
        let air = entry.air_quality.clone().unwrap_or_default();
        let landslide = match &entry.error {
            Some(err) => format!("{} (error: {})", entry.hazard.landslide_label, err),
            None => format!(
                "{} (score {:.1})",
                entry.hazard.landslide_label, entry.hazard.landslide_score
            ),
        };

        table.add_row(vec![
            Cell::new(color.paint(&entry.point.name).to_string()),
            Cell::new(format!("{:.4}", lat)),
            Cell::new(format!("{:.4}", lon)),
            Cell::new(fmt_opt(weather.temperature, " °C")),
            Cell::new(fmt_opt(weather.humidity, "%")),
            Cell::new(fmt_opt(weather.precip_now, " mm")),
            Cell::new(color.paint(&landslide).to_string()),
            Cell::new(entry.hazard.rainfall_label.to_string()),
            Cell::new(fmt_opt(air.pm25, "")),
            Cell::new(fmt_opt(air.pm10, "")),
            Cell::new(entry.hazard.aqi_category.to_string()),
        ]);
    }
    table
}

/// Prints each snapshot as a table to stdout.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    /// Clear the screen before each render (live mode).
    pub clear_screen: bool,
    renders: u64,
}

impl TerminalSurface {
    pub fn new(clear_screen: bool) -> Self {
        Self {
            clear_screen,
            renders: 0,
        }
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }
}

impl PresentationSurface for TerminalSurface {
    fn render(
        &mut self,
        snapshot: &AggregateSnapshot,
        updated_label: &str,
        river_summary: &str,
    ) -> Result<()> {
        if self.clear_screen {
            print!("\x1B[2J\x1B[1;1H");
        }
        println!("{}", "Live Hazard Monitor".cyan().bold());
        println!("Updated: {}", updated_label);
        println!("{} {}", "River:".bold(), river_summary);
        println!("{}", snapshot_table(snapshot));
        let failed = snapshot.failed_points();
        if failed > 0 {
            println!(
                "{}",
                format!("{} of {} points unavailable", failed, snapshot.points.len()).yellow()
            );
        }
        self.renders += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AirQualityReading, GeoPoint, HazardAssessment, RiverLevelReading, WeatherReading,
    };
    use chrono::{FixedOffset, TimeZone};

    fn entry(name: &str, lat: f64, lon: f64, label: HazardLabel, precip: f64) -> PointSnapshot {
        PointSnapshot {
            point: GeoPoint::new(name, lat, lon),
            weather: Some(WeatherReading {
                precip_now: Some(precip),
                ..WeatherReading::default()
            }),
            air_quality: None,
            hazard: HazardAssessment {
                landslide_label: label,
                ..HazardAssessment::default()
            },
            error: None,
        }
    }

    fn snapshot(points: Vec<PointSnapshot>) -> AggregateSnapshot {
        AggregateSnapshot {
            timestamp: FixedOffset::east_opt(330 * 60)
                .unwrap()
                .with_ymd_and_hms(2024, 7, 14, 9, 0, 0)
                .unwrap(),
            points,
            river: RiverLevelReading::no_data(),
        }
    }

    #[test]
    fn test_marker_color_precedence() {
        assert_eq!(marker_color(&entry("a", 27.0, 88.0, HazardLabel::Confirm, 0.0)), MarkerColor::DarkRed);
        assert_eq!(marker_color(&entry("a", 27.0, 88.0, HazardLabel::High, 30.0)), MarkerColor::Red);
        assert_eq!(marker_color(&entry("a", 27.0, 88.0, HazardLabel::Mid, 30.0)), MarkerColor::Orange);
        assert_eq!(marker_color(&entry("a", 27.0, 88.0, HazardLabel::No, 5.0)), MarkerColor::Blue);
        assert_eq!(marker_color(&entry("a", 27.0, 88.0, HazardLabel::No, 4.9)), MarkerColor::Green);

        let failed = PointSnapshot::failed(GeoPoint::new("b", 27.0, 88.0), "down".to_string());
        assert_eq!(marker_color(&failed), MarkerColor::Green);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Chowrasta to Ghoom is roughly 1.2 km.
        let d = haversine_km(27.0359, 88.2626, 27.0470, 88.2632);
        assert!((d - 1.235).abs() < 0.01, "distance was {}", d);
        assert_eq!(haversine_km(27.0, 88.0, 27.0, 88.0), 0.0);
    }

    #[test]
    fn test_display_positions_shift_close_points_only() {
        let snap = snapshot(vec![
            entry("Chowrasta / Mall", 27.0359, 88.2626, HazardLabel::No, 0.0),
            entry("Glenary's / Observatory", 27.0350, 88.2640, HazardLabel::No, 0.0),
            entry("Kurseong", 26.8820, 88.2774, HazardLabel::No, 0.0),
        ]);

        let positions = display_positions(&snap);

        assert_eq!(positions[0], (27.0359, 88.2626));
        assert!((positions[1].0 - (27.0350 + 0.0015)).abs() < 1e-12);
        assert!((positions[1].1 - (88.2640 + 0.0025)).abs() < 1e-12);
        assert_eq!(positions[2], (26.8820, 88.2774));
        // Canonical coordinates are untouched.
        assert_eq!(snap.points[1].point.lat, 27.0350);
    }

    #[test]
    fn test_table_shows_both_particulates() {
        let mut ghoom = entry("Ghoom", 27.0470, 88.2632, HazardLabel::No, 0.0);
        ghoom.air_quality = Some(AirQualityReading {
            pm25: Some(37.2),
            pm10: Some(64.8),
        });
        let table = snapshot_table(&snapshot(vec![ghoom]));

        let header: Vec<String> = table
            .header()
            .unwrap()
            .cell_iter()
            .map(|cell| cell.content())
            .collect();
        assert_eq!(&header[8..], ["PM2.5", "PM10", "AQI"]);

        let rendered = table.to_string();
        assert!(rendered.contains("37.2"));
        assert!(rendered.contains("64.8"));
    }

    #[test]
    fn test_terminal_surface_renders_all_points() {
        let snap = snapshot(vec![
            entry("Ghoom", 27.0470, 88.2632, HazardLabel::Mid, 1.0),
            PointSnapshot::failed(GeoPoint::new("Lebong", 27.0161, 88.2536), "HTTP 500".to_string()),
        ]);
        let table = snapshot_table(&snap).to_string();
        assert!(table.contains("Ghoom"));
        assert!(table.contains("error: HTTP 500"));

        let mut surface = TerminalSurface::new(false);
        surface
            .render(&snap, &snap.updated_label(), &snap.river.summary())
            .unwrap();
        assert_eq!(surface.renders(), 1);
    }
}
