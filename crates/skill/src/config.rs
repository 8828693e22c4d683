use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    /// Language used for intent registration and speech.
    pub lang: String,

    /// Where the GUI can find this skill's pages. When unset, pages are
    /// referred to by bare name.
    pub ui_directory: Option<PathBuf>,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            lang: "en-us".into(),
            ui_directory: None,
        }
    }
}
