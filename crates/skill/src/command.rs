use clap::Subcommand;
use serde_json::{Map, Value};

#[derive(Subcommand, Debug, Clone)]
pub enum SkillRequest {
    /// trigger an intent as if the intent service had matched it
    Intent {
        /// intent file name, e.g. OpenCamera.intent
        file_name: String,
    },

    /// call one of the skill's public api methods
    Call { method: String },

    /// deliver an arbitrary bus event to the skill
    Event {
        msg_type: String,

        /// sets `status` in the event data
        #[clap(short, long)]
        status: Option<String>,
    },

    /// stop whatever the skill is doing
    Stop,

    /// show the gui session
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkillResponse {
    Unit,
    Status {
        values: Map<String, Value>,
        pages: Vec<String>,
    },
}
