use std::path::Path;

use config::{Config, ConfigError};
use cs_bus::BusConfig;
use cs_camera::CameraConfig;
use cs_skill::SkillConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CameraSkillConfig {
    pub bus: BusConfig,
    pub skill: SkillConfig,
    pub camera: CameraConfig,
}

impl CameraSkillConfig {
    /// Reads the config file at `path` if it exists, then applies overrides
    /// from `CAMERA_SKILL_<SECTION>__<KEY>` environment variables.
    pub fn read_from_path(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("CAMERA_SKILL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
