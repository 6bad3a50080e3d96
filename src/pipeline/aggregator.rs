//! Builds one `AggregateSnapshot` from every registry point plus the river probe.

use crate::api::{EnvironmentalSource, RiverSource};
use crate::config::Settings;
use crate::error::Result;
use crate::hazard;
use crate::models::{AggregateSnapshot, GeoPoint, PointSnapshot};
use crate::pipeline::SnapshotSource;
use crate::registry::GeoPointRegistry;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, error, info, warn};

/// Runs the environmental source and the hazard scorer over a registry.
pub struct SnapshotAggregator<E, R> {
    registry: GeoPointRegistry,
    environment: E,
    river: R,
    settings: Settings,
}

impl<E: EnvironmentalSource, R: RiverSource> SnapshotAggregator<E, R> {
    pub fn new(registry: GeoPointRegistry, environment: E, river: R, settings: &Settings) -> Self {
        Self {
            registry,
            environment,
            river,
            settings: settings.clone(),
        }
    }

    pub fn registry(&self) -> &GeoPointRegistry {
        &self.registry
    }

    /// Processes one point. A fetch error becomes a placeholder entry, never an `Err`.
    pub async fn collect_point(&self, point: &GeoPoint, now: DateTime<FixedOffset>) -> PointSnapshot {
        match self.environment.fetch_point(point, now).await {
            Ok(readings) => {
                let hazard = hazard::assess(&readings.weather, &readings.air_quality, self.settings.elevation_m);
                debug!(
                    "{}: landslide {:.1} ({}), rain {}, AQI {}",
                    point.name,
                    hazard.landslide_score,
                    hazard.landslide_label,
                    hazard.rainfall_label,
                    hazard.aqi_category
                );
                PointSnapshot {
                    point: point.clone(),
                    weather: Some(readings.weather),
                    air_quality: Some(readings.air_quality),
                    hazard,
                    error: None,
                }
            },
            Err(e) => {
                if e.is_source_error() {
                    warn!("Point {} failed, using placeholder: {}", point.name, e);
                } else {
                    error!("Point {} failed for a non-source reason: {}", point.name, e);
                }
                PointSnapshot::failed(point.clone(), e.to_string())
            },
        }
    }

    /// Runs a full pass: every point in registry order, aligned to the hour of
    /// `now`, then the river once. The snapshot is stamped when the pass ends.
    pub async fn aggregate_at(&self, now: DateTime<FixedOffset>) -> AggregateSnapshot {
        if self.registry.is_empty() {
            warn!("No points registered, the snapshot will only carry the river level");
        }
        let mut points = Vec::with_capacity(self.registry.len());
        for point in self.registry.points() {
            points.push(self.collect_point(point, now).await);
        }
        let river = self.river.probe().await;

        let snapshot = AggregateSnapshot {
            timestamp: self.settings.local_now(),
            points,
            river,
        };
        info!(
            "Aggregated {} points ({} failed), river {}",
            snapshot.points.len(),
            snapshot.failed_points(),
            snapshot.river.status
        );
        snapshot
    }

    /// Runs a full pass at the current local time.
    pub async fn aggregate(&self) -> AggregateSnapshot {
        self.aggregate_at(self.settings.local_now()).await
    }
}

impl<E, R> SnapshotSource for SnapshotAggregator<E, R>
where
    E: EnvironmentalSource + 'static,
    R: RiverSource + 'static,
{
    async fn collect(&self) -> Result<AggregateSnapshot> {
        Ok(self.aggregate().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PointReadings;
    use crate::error::AppError;
    use crate::models::{
        AirQualityReading, AqiCategory, HazardLabel, RiverLevelReading, RiverStatus, WeatherReading,
    };
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // --- Canned sources ---

    struct CannedEnvironment {
        readings: HashMap<String, Result<PointReadings>>,
        calls: AtomicUsize,
    }

    impl CannedEnvironment {
        fn new(entries: Vec<(&str, Result<PointReadings>)>) -> Self {
            Self {
                readings: entries
                    .into_iter()
                    .map(|(name, r)| (name.to_string(), r))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EnvironmentalSource for CannedEnvironment {
        async fn fetch_point(
            &self,
            point: &GeoPoint,
            _now: DateTime<FixedOffset>,
        ) -> Result<PointReadings> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.readings
                .get(&point.name)
                .cloned()
                .unwrap_or_else(|| Err(AppError::MalformedResponse(format!("no canned data for {}", point.name))))
        }
    }

    struct CannedRiver {
        reading: RiverLevelReading,
        calls: AtomicUsize,
    }

    impl RiverSource for CannedRiver {
        async fn probe(&self) -> RiverLevelReading {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reading.clone()
        }
    }

    fn river(status: RiverStatus) -> CannedRiver {
        CannedRiver {
            reading: RiverLevelReading {
                value: Some(320.0),
                unit_label: Some("cm".to_string()),
                status,
            },
            calls: AtomicUsize::new(0),
        }
    }

    fn readings(humidity: f64, drop: f64, precip: f64, pm25: Option<f64>) -> Result<PointReadings> {
        Ok(PointReadings {
            weather: WeatherReading {
                temperature: Some(15.0),
                humidity: Some(humidity),
                pressure: Some(1004.0),
                precip_now: Some(precip),
                precip_next_hour: Some(0.0),
                pressure_drop_3h: Some(drop),
            },
            air_quality: AirQualityReading { pm25, pm10: pm25.map(|v| v * 1.5) },
        })
    }

    fn registry() -> GeoPointRegistry {
        GeoPointRegistry::new(vec![
            GeoPoint::new("Ghoom", 27.0470, 88.2632),
            GeoPoint::new("Lebong", 27.0161, 88.2536),
            GeoPoint::new("Kurseong", 26.8820, 88.2774),
        ])
        .unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(330 * 60)
            .unwrap()
            .with_ymd_and_hms(2024, 7, 14, 4, 20, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_point_failure_is_isolated() {
        let environment = CannedEnvironment::new(vec![
            ("Ghoom", readings(80.0, 2.0, 0.5, Some(10.0))),
            (
                "Lebong",
                Err(AppError::HttpStatus {
                    status: 500,
                    url: "http://localhost/v1/forecast".to_string(),
                }),
            ),
            ("Kurseong", readings(95.0, 4.0, 22.0, Some(60.0))),
        ]);
        let aggregator =
            SnapshotAggregator::new(registry(), environment, river(RiverStatus::High), &Settings::default());

        let snapshot = aggregator.aggregate_at(now()).await;

        assert_eq!(snapshot.points.len(), 3);
        let names: Vec<&str> = snapshot.points.iter().map(|p| p.point.name.as_str()).collect();
        assert_eq!(names, vec!["Ghoom", "Lebong", "Kurseong"]);
        assert_eq!(snapshot.failed_points(), 1);

        let ghoom = &snapshot.points[0];
        assert!(ghoom.error.is_none());
        assert!((ghoom.hazard.landslide_score - 47.0).abs() < 1e-9);
        assert_eq!(ghoom.hazard.landslide_label, HazardLabel::Mid);
        assert_eq!(ghoom.hazard.rainfall_label, HazardLabel::Mid);
        assert_eq!(ghoom.hazard.aqi_category, AqiCategory::Good);

        let lebong = &snapshot.points[1];
        assert_eq!(lebong.error.as_deref(), Some("HTTP 500 from http://localhost/v1/forecast"));
        assert!(lebong.weather.is_none());
        assert!(lebong.air_quality.is_none());
        assert_eq!(lebong.hazard.landslide_score, 0.0);
        assert_eq!(lebong.hazard.landslide_label, HazardLabel::No);
        assert_eq!(lebong.hazard.aqi_category, AqiCategory::Unknown);

        let kurseong = &snapshot.points[2];
        assert!(kurseong.error.is_none());
        assert_eq!(kurseong.hazard.landslide_label, HazardLabel::High);
        assert_eq!(kurseong.hazard.rainfall_label, HazardLabel::Confirm);
        assert_eq!(kurseong.hazard.aqi_category, AqiCategory::Unhealthy);

        assert_eq!(snapshot.river.status, RiverStatus::High);
    }

    #[tokio::test]
    async fn test_every_point_failing_still_probes_river() {
        let environment = CannedEnvironment::new(Vec::new());
        let aggregator =
            SnapshotAggregator::new(registry(), environment, river(RiverStatus::NoData), &Settings::default());

        let snapshot = aggregator.aggregate_at(now()).await;

        assert_eq!(snapshot.points.len(), 3);
        assert_eq!(snapshot.failed_points(), 3);
        assert_eq!(aggregator.environment.calls.load(Ordering::SeqCst), 3);
        assert_eq!(aggregator.river.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_registry_yields_empty_snapshot() {
        let registry = GeoPointRegistry::new(Vec::new()).unwrap();
        let aggregator = SnapshotAggregator::new(
            registry,
            CannedEnvironment::new(Vec::new()),
            river(RiverStatus::Normal),
            &Settings::default(),
        );

        let snapshot = aggregator.collect().await.unwrap();

        assert!(snapshot.points.is_empty());
        assert_eq!(snapshot.river.status, RiverStatus::Normal);
        assert_eq!(aggregator.river.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timestamp_taken_when_pass_ends() {
        let aggregator = SnapshotAggregator::new(
            registry(),
            CannedEnvironment::new(Vec::new()),
            river(RiverStatus::Normal),
            &Settings::default(),
        );

        // `now` only aligns the hourly series; the stamp is the completion time.
        let before = Settings::default().local_now();
        let snapshot = aggregator.aggregate_at(now()).await;

        assert!(snapshot.timestamp > now());
        assert!(snapshot.timestamp >= before);
        assert_eq!(snapshot.timestamp.offset().local_minus_utc(), 330 * 60);
    }

    #[tokio::test]
    async fn test_aggregate_stamps_configured_offset() {
        let aggregator = SnapshotAggregator::new(
            registry(),
            CannedEnvironment::new(Vec::new()),
            river(RiverStatus::Normal),
            &Settings::default(),
        );
        let snapshot = aggregator.aggregate().await;
        assert_eq!(snapshot.timestamp.offset().local_minus_utc(), 330 * 60);
    }
}
