use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_SKILL_ID: &str = "skill-camera.openvoiceos";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub skill_id: String,

    /// Where photos are saved. Defaults to the user's pictures directory.
    /// A leading `~` is expanded to the home directory.
    pub save_folder: Option<PathBuf>,

    /// Seconds the camera page stays up before the GUI goes idle.
    pub idle_timeout: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            skill_id: DEFAULT_SKILL_ID.into(),
            save_folder: None,
            idle_timeout: 60,
        }
    }
}

impl CameraConfig {
    /// Resolves the folder photos are saved to. Does not touch the
    /// filesystem.
    pub fn resolve_save_folder(&self) -> anyhow::Result<PathBuf> {
        match &self.save_folder {
            Some(path) => expand_home(path),
            None => dirs::picture_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
                .context("could not determine the pictures directory"),
        }
    }
}

fn expand_home(path: &Path) -> anyhow::Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().context("could not determine the home directory")?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_owned()),
    }
}

/// Creates `path` (and its parents) unless it already is a directory.
pub fn ensure_folder(path: &Path) -> anyhow::Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    info!("creating save folder {}", path.display());

    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create save folder {}", path.display()))
}
