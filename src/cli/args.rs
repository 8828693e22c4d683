use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(version, about = "Camera skill for the voice assistant's message bus")]
pub struct MainArgs {
    /// The path to the config file for the camera skill
    #[clap(long, short, default_value = "camera-skill.toml")]
    pub config: PathBuf,

    /// Read commands from stdin to drive the skill without speaking to it
    #[clap(long, short)]
    pub interactive: bool,
}
