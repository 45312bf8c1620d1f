//! Config file watcher with debounced reloads
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by replacing the file keep triggering reloads. Bursts of change
//! events collapse into a single reload once the file has been quiet for
//! [`RELOAD_DEBOUNCE`].

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Quiet period required before a changed config file is reloaded
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Delivers a freshly loaded `AppConfig` after each settled change
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load `config_path` and start watching it
    ///
    /// Returns the watcher together with the initially loaded configuration.
    pub async fn new(config_path: String) -> Result<(Self, AppConfig)> {
        let initial_config = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        let path = Path::new(&config_path);
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .with_context(|| format!("Config path has no file name: {}", config_path))?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };

        // notify calls back on its own thread; only forward a wake-up signal
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if touches_file(&event, &file_name) {
                    debug!("Config file changed: {:?}", event.kind);
                    let _ = change_tx.send(());
                }
            }
            Err(e) => error!("Watch error: {}", e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", dir.display()))?;

        let (tx, rx) = mpsc::channel(10);
        tokio::spawn(reload_loop(config_path.clone(), change_rx, tx));

        info!("Config file watcher started for: {}", config_path);

        Ok((Self { _watcher: watcher, rx }, initial_config))
    }

    /// Wait for the next config update
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

fn touches_file(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// One reload per burst of change signals
async fn reload_loop(
    config_path: String,
    mut changes: mpsc::UnboundedReceiver<()>,
    tx: mpsc::Sender<AppConfig>,
) {
    while changes.recv().await.is_some() {
        loop {
            match tokio::time::timeout(RELOAD_DEBOUNCE, changes.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        match AppConfig::load(&config_path).await {
            Ok(new_config) => {
                info!("Configuration reloaded successfully");
                if tx.send(new_config).await.is_err() {
                    debug!("Config receiver dropped, stopping reloads");
                    return;
                }
            }
            Err(e) => warn!("Failed to reload config (keeping old config): {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SETTLE: Duration = Duration::from_millis(400);

    fn yaml(host: &str, port: u16) -> String {
        format!("media:\n  host: \"{}\"\n  port: {}\n", host, port)
    }

    async fn watch(temp_dir: &TempDir) -> Result<(ConfigWatcher, AppConfig, std::path::PathBuf)> {
        let config_path = temp_dir.path().join("bridge.yaml");
        fs::write(&config_path, yaml("10.0.0.2", 6262))?;

        let (watcher, config) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;
        Ok((watcher, config, config_path))
    }

    #[tokio::test]
    async fn test_reload_after_change() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let (mut watcher, config, config_path) = watch(&temp_dir).await?;
        assert_eq!(config.media.host, "10.0.0.2");

        tokio::time::sleep(Duration::from_millis(50)).await;
        fs::write(&config_path, yaml("10.0.0.3", 7000))?;

        let new_config = tokio::time::timeout(Duration::from_secs(2), watcher.next_config())
            .await?
            .expect("watcher closed");
        assert_eq!(new_config.media.host, "10.0.0.3");
        assert_eq!(new_config.media.port, 7000);

        Ok(())
    }

    #[tokio::test]
    async fn test_burst_of_writes_reloads_once() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let (mut watcher, _, config_path) = watch(&temp_dir).await?;

        tokio::time::sleep(Duration::from_millis(50)).await;
        fs::write(&config_path, yaml("10.0.0.3", 7000))?;
        tokio::time::sleep(Duration::from_millis(10)).await;
        fs::write(&config_path, yaml("10.0.0.4", 7001))?;

        let reloaded = tokio::time::timeout(Duration::from_secs(2), watcher.next_config())
            .await?
            .expect("watcher closed");
        assert_eq!(reloaded.media.host, "10.0.0.4");
        assert_eq!(reloaded.media.port, 7001);

        let extra = tokio::time::timeout(SETTLE, watcher.next_config()).await;
        assert!(extra.is_err(), "burst produced a second reload");

        Ok(())
    }

    #[tokio::test]
    async fn test_sibling_files_are_ignored() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let (mut watcher, _, _) = watch(&temp_dir).await?;

        tokio::time::sleep(Duration::from_millis(50)).await;
        fs::write(temp_dir.path().join("notes.txt"), "unrelated")?;

        let reload = tokio::time::timeout(SETTLE, watcher.next_config()).await;
        assert!(reload.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_reload_keeps_watching() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let (mut watcher, _, config_path) = watch(&temp_dir).await?;

        tokio::time::sleep(Duration::from_millis(50)).await;
        fs::write(&config_path, "media:\n  port: 0\n")?;
        assert!(tokio::time::timeout(SETTLE, watcher.next_config()).await.is_err());

        fs::write(&config_path, yaml("10.0.0.5", 6262))?;
        let reloaded = tokio::time::timeout(Duration::from_secs(2), watcher.next_config())
            .await?
            .expect("watcher closed");
        assert_eq!(reloaded.media.host, "10.0.0.5");

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("absent.yaml");

        let result = ConfigWatcher::new(config_path.to_string_lossy().to_string()).await;
        assert!(result.is_err());
    }
}
