use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::ScreenshotConfig;
use crate::scraper::PageSession;
use crate::utils::error::Result;

/// Writes diagnostic full-page captures. Never read back, never fatal.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    enabled: bool,
}

impl SnapshotStore {
    pub fn new(config: &ScreenshotConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            enabled: config.enabled,
        }
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the snapshot directory. Part of startup, so errors propagate.
    pub fn prepare(&self) -> Result<()> {
        if self.enabled {
            std::fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Capture under a fixed step name, e.g. `initial_page.png`.
    pub async fn capture(&self, session: &mut dyn PageSession, name: &str) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }

        let path = self.dir.join(format!("{}.png", name));
        match self.write(session, &path).await {
            Ok(()) => {
                debug!("Saved snapshot {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failed to save snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Capture under `<prefix>_<timestamp>`, e.g. `error_2025-03-01T10-00-00.000Z.png`.
    pub async fn capture_timestamped(&self, session: &mut dyn PageSession, prefix: &str) -> Option<PathBuf> {
        let name = timestamped_name(prefix, Utc::now());
        self.capture(session, &name).await
    }

    async fn write(&self, session: &mut dyn PageSession, path: &Path) -> Result<()> {
        let png = session.screenshot().await?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }
}

/// ISO-8601 timestamp with `:` swapped for `-` so it is a valid file name.
pub fn timestamped_name(prefix: &str, at: DateTime<Utc>) -> String {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true).replace(':', "-");
    format!("{}_{}", prefix, stamp)
}
