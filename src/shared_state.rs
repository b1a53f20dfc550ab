use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::config::{EngineConfig, PointConfig};
use crate::error::RefreshError;
use crate::models::illuminance::{PointSummary, RefreshAllResponse, UpdateResult};
use crate::services::engine::{self, EngineState};
use crate::services::weather_service::{SnapshotProvider, provider_for};

/// One monitored location: its input source, current options, engine
/// state and the last published result.
pub struct PointRuntime {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub language: String,
    provider: Box<dyn SnapshotProvider>,
    config: RwLock<Arc<EngineConfig>>,
    /// Held for the whole refresh, so periodic and manual runs never overlap
    state: Mutex<EngineState>,
    latest: RwLock<Option<Arc<UpdateResult>>>,
}

impl PointRuntime {
    pub fn new(point: &PointConfig) -> Self {
        Self::with_provider(point, provider_for(point))
    }

    pub fn with_provider(point: &PointConfig, provider: Box<dyn SnapshotProvider>) -> Self {
        Self {
            id: point.id.clone(),
            name: point.name.clone(),
            latitude: point.latitude,
            longitude: point.longitude,
            language: point.language.clone(),
            provider,
            config: RwLock::new(Arc::new(point.options.clone())),
            state: Mutex::new(EngineState::new()),
            latest: RwLock::new(None),
        }
    }

    pub fn config(&self) -> Arc<EngineConfig> {
        if let Ok(config) = self.config.read() {
            config.clone()
        } else {
            Arc::new(EngineConfig::default())
        }
    }

    /// Takes effect on the next cycle; accumulated state is kept.
    pub fn reconfigure(&self, config: EngineConfig) {
        if let Ok(mut current) = self.config.write() {
            *current = Arc::new(config);
            info!("{}: options replaced", self.id);
        }
    }

    pub fn latest(&self) -> Option<Arc<UpdateResult>> {
        if let Ok(latest) = self.latest.read() {
            latest.clone()
        } else {
            None
        }
    }

    pub async fn refresh(&self) -> Result<Arc<UpdateResult>, RefreshError> {
        let mut state = self.state.lock().await;
        let config = self.config();

        let snapshot = self.provider.snapshot(Utc::now()).await?;
        let result = Arc::new(engine::update(&snapshot, &config, &mut state)?);

        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(result.clone());
        }
        info!(
            "[UPDATE] {} ({}) | raw: {:.0} lx | control: {:.0} lx | dark: {} | {}",
            self.id,
            self.provider.kind(),
            result.raw_lux,
            result.control_lux,
            result.is_dark,
            result.daypart.as_str()
        );
        Ok(result)
    }

    pub fn summary(&self) -> PointSummary {
        PointSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            language: self.language.clone(),
            scan_seconds: self.config().scan_period_seconds,
            has_result: self.latest().is_some(),
        }
    }
}

/// Refreshes `point` at start and then every `scan_seconds`, re-reading
/// the period each time. A shutdown signal cancels the pending sleep only.
pub async fn run_scheduler(point: Arc<PointRuntime>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        if let Err(e) = point.refresh().await {
            warn!("{}: refresh failed, keeping previous result: {}", point.id, e);
        }

        let period = Duration::from_secs(u64::from(point.config().scan_period_seconds));
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            changed = shutdown.changed() => {
                // Sender gone counts as shutdown
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    info!("{}: scheduler stopped", point.id);
}

#[derive(Clone)]
pub struct AppState {
    /// Points in configuration order
    pub points: Arc<Vec<Arc<PointRuntime>>>,
    pub mqtt_connected: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(points: Vec<PointRuntime>) -> Self {
        Self {
            points: Arc::new(points.into_iter().map(Arc::new).collect()),
            mqtt_connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn point(&self, id: &str) -> Option<Arc<PointRuntime>> {
        self.points.iter().find(|p| p.id == id).cloned()
    }

    pub fn is_mqtt_connected(&self) -> bool {
        self.mqtt_connected.load(Ordering::Relaxed)
    }

    pub fn set_mqtt_connected(&self, value: bool) {
        self.mqtt_connected.store(value, Ordering::Relaxed);
    }

    /// Refreshes every point concurrently. Each point still serializes
    /// against its own scheduler.
    pub async fn refresh_all(&self) -> RefreshAllResponse {
        let outcomes = join_all(self.points.iter().map(|point| async move {
            let outcome = point.refresh().await;
            if let Err(e) = &outcome {
                warn!("{}: refresh failed: {}", point.id, e);
            }
            (point.id.clone(), outcome.is_ok())
        }))
        .await;

        let (ok, failed): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(|(_, ok)| *ok);
        RefreshAllResponse {
            refreshed: ok.into_iter().map(|(id, _)| id).collect(),
            failed: failed.into_iter().map(|(id, _)| id).collect(),
        }
    }

    /// Point id → displayed lux for every point with a result.
    pub fn global_illuminance(&self) -> BTreeMap<String, f64> {
        self.points
            .iter()
            .filter_map(|p| Some((p.id.clone(), p.latest()?.native_value())))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::error::SourceError;
    use crate::models::illuminance::InputSnapshot;
    use crate::models::weather::SensorReadings;
    use crate::services::weather_service::SnapshotFuture;
    use chrono::{DateTime, Duration as ChronoDuration};
    use std::sync::atomic::AtomicUsize;

    /// Replays fixed elevations one per call; `None` entries fail the call.
    pub(crate) struct ScriptedProvider {
        pub script: Vec<Option<f64>>,
        pub calls: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub max_in_flight: Arc<AtomicUsize>,
        pub delay: Duration,
    }

    impl ScriptedProvider {
        pub(crate) fn new(script: Vec<Option<f64>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: Arc::new(AtomicUsize::new(0)),
                delay: Duration::from_millis(0),
            }
        }
    }

    impl SnapshotProvider for ScriptedProvider {
        fn snapshot(&self, now: DateTime<Utc>) -> SnapshotFuture<'_> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(running, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                let step = self.script.get(call).copied().flatten();
                match step {
                    Some(elevation) => {
                        let at = now + ChronoDuration::minutes(2 * call as i64);
                        let mut snapshot = InputSnapshot::new(at, elevation, Some(180.0));
                        snapshot.cloud_cover_pct = Some(0.0);
                        Ok(snapshot)
                    }
                    None => Err(SourceError::Io {
                        path: "scripted".into(),
                        source: std::io::Error::other("scripted failure"),
                    }),
                }
            })
        }

        fn kind(&self) -> &'static str {
            "scripted"
        }
    }

    pub(crate) fn point_config(id: &str) -> PointConfig {
        PointConfig {
            id: id.into(),
            name: format!("Point {id}"),
            latitude: 45.07,
            longitude: 7.33,
            language: "en".into(),
            source: SourceConfig::Static {
                readings: SensorReadings::default(),
            },
            options: EngineConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_result() {
        let provider = ScriptedProvider::new(vec![Some(40.0), None, Some(f64::NAN)]);
        let point = PointRuntime::with_provider(&point_config("garden"), Box::new(provider));

        let first = point.refresh().await.unwrap();
        assert!(matches!(point.refresh().await, Err(RefreshError::Source(_))));
        assert!(matches!(point.refresh().await, Err(RefreshError::Engine(_))));

        let latest = point.latest().unwrap();
        assert!(Arc::ptr_eq(&latest, &first));
        assert_eq!(point.state.lock().await.history.len(), 1);
    }

    #[tokio::test]
    async fn test_refreshes_are_serialized() {
        let mut provider = ScriptedProvider::new(vec![Some(30.0); 4]);
        provider.delay = Duration::from_millis(20);
        let max_in_flight = provider.max_in_flight.clone();
        let point = Arc::new(PointRuntime::with_provider(&point_config("roof"), Box::new(provider)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let point = point.clone();
                tokio::spawn(async move { point.refresh().await.is_ok() })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(point.state.lock().await.history.len(), 4);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconfigure_applies_next_cycle() {
        let provider = ScriptedProvider::new(vec![Some(30.0), Some(30.0)]);
        let point = PointRuntime::with_provider(&point_config("yard"), Box::new(provider));
        assert!(!point.refresh().await.unwrap().is_dark);

        let options = crate::config::EngineOptions {
            on_threshold: 500_000.0,
            off_threshold: 600_000.0,
            ..Default::default()
        };
        point.reconfigure(EngineConfig::try_from(options).unwrap());
        assert_eq!(point.summary().scan_seconds, 120);

        let second = point.refresh().await.unwrap();
        assert!(second.is_dark);
        assert_eq!(point.state.lock().await.history.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_all_and_global_map() {
        let ok = PointRuntime::with_provider(&point_config("a"), Box::new(ScriptedProvider::new(vec![Some(20.0)])));
        let broken = PointRuntime::with_provider(&point_config("b"), Box::new(ScriptedProvider::new(vec![None])));
        let state = AppState::new(vec![ok, broken]);

        let outcome = state.refresh_all().await;
        assert_eq!(outcome.refreshed, vec!["a".to_string()]);
        assert_eq!(outcome.failed, vec!["b".to_string()]);

        let global = state.global_illuminance();
        assert_eq!(global.len(), 1);
        assert!(global["a"] > 0.0);
        assert!(state.point("b").unwrap().latest().is_none());
        assert!(state.point("c").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_stops_on_shutdown() {
        let provider = ScriptedProvider::new(vec![Some(10.0); 8]);
        let point = Arc::new(PointRuntime::with_provider(&point_config("s"), Box::new(provider)));
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(run_scheduler(point.clone(), rx));
        tokio::time::sleep(Duration::from_secs(250)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        // Start, +120 s, +240 s
        assert_eq!(point.state.lock().await.history.len(), 3);
    }
}
