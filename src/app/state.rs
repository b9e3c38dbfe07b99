use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cooprings_core::config::AppConfig;
use cooprings_core::metrics::Metrics;
use cooprings_core::report::RunReport;
use cooprings_data::SystemSnapshot;

use super::ShutdownManager;
use crate::model::system::{SharedSystem, System};

pub struct App {
    pub system: SharedSystem,
    pub shutdown: ShutdownManager,
    /// Where the final snapshot is written, if anywhere.
    pub save_path: Option<PathBuf>,
    metrics: Arc<Metrics>,
}

impl App {
    /// Reads `path`, falling back to defaults when it is missing or invalid.
    pub fn load_config(path: &str) -> AppConfig {
        match std::fs::read_to_string(path) {
            Ok(content) => match AppConfig::from_toml(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Failed to load {}: {}", path, e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to read {}: {}", path, e),
        }
        AppConfig::default()
    }

    /// A fresh system with newly created traders.
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut system = System::new(config)?;
        system.init()?;
        Ok(Self::from_system(system))
    }

    /// A system rebuilt from the snapshot at `path`.
    pub fn load<P: AsRef<Path>>(path: P, config: AppConfig) -> Result<Self> {
        let path = path.as_ref();
        let snapshot = cooprings_io::load_snapshot(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?;
        let system = System::restore(&snapshot, config)?;
        Ok(Self::from_system(system))
    }

    fn from_system(system: System) -> Self {
        let metrics = system.metrics.clone();
        Self {
            system: system.into_shared(),
            shutdown: ShutdownManager::new(),
            save_path: None,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        self.system
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }

    pub fn report(&self) -> RunReport {
        RunReport::from_snapshot(&self.snapshot())
    }

    pub fn save_state(&self) -> Result<()> {
        let Some(path) = &self.save_path else {
            return Ok(());
        };
        tracing::info!(path = %path.display(), "Saving state before exit...");
        cooprings_io::save_snapshot(&self.snapshot(), path)?;
        Ok(())
    }

    /// Runs until the configured time elapses, Ctrl-C arrives, or every
    /// trader runs out of funds. A `run_seconds` of zero means no time limit.
    pub async fn run(&mut self) -> Result<RunReport> {
        let run_seconds = self
            .system
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .simulation
            .run_seconds;

        let trigger = self.shutdown.clone();
        let timer = tokio::spawn(async move {
            let elapsed = async {
                if run_seconds == 0 {
                    std::future::pending::<()>().await;
                }
                tokio::time::sleep(Duration::from_secs(run_seconds)).await;
            };
            let interrupted = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            tokio::select! {
                _ = elapsed => tracing::info!(run_seconds, "Run time elapsed"),
                _ = interrupted => tracing::info!("Interrupted"),
            }
            trigger.request_shutdown();
        });

        let result = System::start(self.system.clone(), self.shutdown.subscribe()).await;
        timer.abort();
        self.conclude(result).await
    }

    /// Saves and reports whatever state the run reached. A halted run still
    /// yields its report; the failure shows up as a non-zero exit code.
    async fn conclude(&mut self, result: cooprings_core::error::Result<()>) -> Result<RunReport> {
        if let Err(e) = &result {
            tracing::error!(error = %e, class = ?e.class(), "Run halted");
            self.shutdown.set_exit_code(1);
        }
        self.shutdown.cleanup(self).await?;
        Ok(self.report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.simulation.num_traders = 3;
        config.simulation.num_random_voters = 0;
        config.simulation.num_bad_voters = 0;
        config.simulation.coin_type_count = 2;
        config.simulation.seed = Some(11);
        config
    }

    #[test]
    fn test_missing_config_falls_back() {
        let config = App::load_config("definitely-not-here.toml");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_new_app_has_traders() {
        let app = App::new(quick_config()).unwrap();
        assert_eq!(app.report().traders, 3);
    }

    #[test]
    fn test_save_without_path_is_noop() {
        let app = App::new(quick_config()).unwrap();
        assert!(app.save_state().is_ok());
    }

    #[tokio::test]
    async fn test_run_stops_on_request() {
        let mut app = App::new(quick_config()).unwrap();
        app.shutdown.set_save_on_exit(false);
        app.shutdown.request_shutdown();
        let report = app.run().await.unwrap();
        assert_eq!(report.traders, 3);
        assert_eq!(app.shutdown.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_halted_run_reports_with_exit_code() {
        let mut app = App::new(quick_config()).unwrap();
        app.shutdown.set_save_on_exit(false);
        let halt = cooprings_core::error::ProtocolError::RingCollision("r".into());
        let report = app.conclude(Err(halt)).await.unwrap();
        assert_eq!(report.traders, 3);
        assert_eq!(app.shutdown.exit_code(), 1);
    }
}
