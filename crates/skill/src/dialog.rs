use std::collections::HashMap;

use serde_json::{Map, Value};

/// Splits a locale resource into entries. Blank lines and `#` comments are
/// skipped.
pub fn parse_locale_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

#[derive(Debug)]
struct Dialog {
    lines: Vec<String>,
    next: usize,
}

/// Named dialogs. Each render picks the next line of the dialog in turn so
/// repeated prompts don't always sound the same.
#[derive(Debug, Default)]
pub struct DialogSet {
    dialogs: HashMap<String, Dialog>,
}

impl DialogSet {
    pub fn insert(&mut self, name: impl Into<String>, lines: Vec<String>) {
        self.dialogs.insert(name.into(), Dialog { lines, next: 0 });
    }

    /// Renders `name`, replacing `{key}` with values from `data`. A dialog
    /// that doesn't exist renders as its own name with underscores turned
    /// into spaces.
    pub fn render(&mut self, name: &str, data: &Map<String, Value>) -> String {
        let template = match self.dialogs.get_mut(name) {
            Some(dialog) if !dialog.lines.is_empty() => {
                let line = dialog.lines[dialog.next % dialog.lines.len()].clone();
                dialog.next = (dialog.next + 1) % dialog.lines.len();
                line
            }
            _ => {
                warn!("missing dialog {}", name);
                name.replace(['_', '.'], " ")
            }
        };

        data.iter().fold(template, |text, (key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text.replace(&format!("{{{}}}", key), &value)
        })
    }
}
