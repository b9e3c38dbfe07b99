//! Graceful shutdown handling for the application.
//!
//! A stop request flips a watch channel that the running system listens on.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

/// Manages graceful shutdown of a run.
#[derive(Clone)]
pub struct ShutdownManager {
    finish: Arc<watch::Sender<bool>>,
    save_on_exit: bool,
    exit_code: i32,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownManager")
            .field("shutdown_requested", &self.is_shutdown_requested())
            .field("save_on_exit", &self.save_on_exit)
            .field("exit_code", &self.exit_code)
            .finish()
    }
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (finish, _) = watch::channel(false);
        Self {
            finish: Arc::new(finish),
            save_on_exit: true,
            exit_code: 0,
        }
    }

    /// Sets whether to save state on exit.
    pub fn set_save_on_exit(&mut self, save: bool) {
        self.save_on_exit = save;
    }

    /// Requests shutdown. Every subscriber sees the flag flip.
    pub fn request_shutdown(&self) {
        self.finish.send_replace(true);
        tracing::info!("Shutdown requested");
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.finish.borrow()
    }

    /// A receiver that observes the shutdown flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.finish.subscribe()
    }

    pub fn should_save_on_exit(&self) -> bool {
        self.save_on_exit
    }

    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Performs cleanup operations before shutdown.
    pub async fn cleanup(&self, app: &crate::app::App) -> Result<()> {
        tracing::info!("Performing shutdown cleanup...");

        if self.save_on_exit {
            app.save_state()?;
        }

        app.metrics().log_summary();
        tracing::info!("Cleanup complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_manager_new() {
        let manager = ShutdownManager::new();
        assert!(!manager.is_shutdown_requested());
        assert!(manager.should_save_on_exit());
        assert_eq!(manager.exit_code(), 0);
    }

    #[test]
    fn test_shutdown_request() {
        let manager = ShutdownManager::new();
        manager.request_shutdown();
        assert!(manager.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_subscriber_sees_request() {
        let manager = ShutdownManager::new();
        let mut rx = manager.subscribe();
        let remote = manager.clone();
        tokio::spawn(async move { remote.request_shutdown() });
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[test]
    fn test_save_on_exit() {
        let mut manager = ShutdownManager::new();
        manager.set_save_on_exit(false);
        assert!(!manager.should_save_on_exit());
    }

    #[test]
    fn test_exit_code() {
        let mut manager = ShutdownManager::new();
        manager.set_exit_code(1);
        assert_eq!(manager.exit_code(), 1);
    }
}
