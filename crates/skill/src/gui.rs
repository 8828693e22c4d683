use std::path::PathBuf;

use cs_bus::{Emitter, Message};
use serde_json::{json, Map, Value};

/// The skill's view of the GUI: a key/value bag that pages bind to, plus the
/// pages this skill currently has on screen.
#[derive(Debug)]
pub struct GuiSession {
    skill_id: String,
    ui_directory: Option<PathBuf>,
    emitter: Emitter,
    values: Map<String, Value>,
    pages: Vec<String>,
}

impl GuiSession {
    pub fn new(skill_id: impl Into<String>, ui_directory: Option<PathBuf>, emitter: Emitter) -> Self {
        Self {
            skill_id: skill_id.into(),
            ui_directory,
            emitter,
            values: Map::new(),
            pages: Vec::new(),
        }
    }

    /// Stores a value. The GUI only hears about it right away if one of our
    /// pages is showing; otherwise it is sent along with the next page.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        self.values.insert(key.to_owned(), value.clone());

        if !self.pages.is_empty() {
            let mut data = Map::new();
            data.insert(key.to_owned(), value);
            data.insert("__from".into(), json!(self.skill_id));
            self.emitter
                .emit(Message::new("gui.value.set", Value::Object(data)));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Syncs the whole session to the GUI, then shows `name`. `override_idle`
    /// is the number of seconds the page stays up before the GUI returns to
    /// its idle screen.
    pub fn show_page(&mut self, name: &str, override_idle: Option<u64>) {
        let mut data = self.values.clone();
        data.insert("__from".into(), json!(self.skill_id));
        self.emitter
            .emit(Message::new("gui.value.set", Value::Object(data)));

        if !self.pages.iter().any(|p| p == name) {
            self.pages.push(name.to_owned());
        }
        let index = self.pages.iter().position(|p| p == name).unwrap_or_default();

        debug!("showing page {} (idle override {:?})", name, override_idle);

        self.emitter.emit(Message::new(
            "gui.page.show",
            json!({
                "page": self.pages.iter().map(|p| self.page_url(p)).collect::<Vec<_>>(),
                "page_names": self.pages,
                "index": index,
                "__from": self.skill_id,
                "__idle": override_idle,
            }),
        ));
    }

    /// Asks the GUI to drop `name`. Sent even if we don't think the page is
    /// showing.
    pub fn remove_page(&mut self, name: &str) {
        self.pages.retain(|p| p != name);

        debug!("removing page {}", name);

        self.emitter.emit(Message::new(
            "gui.page.delete",
            json!({
                "page": [self.page_url(name)],
                "page_names": [name],
                "__from": self.skill_id,
            }),
        ));
    }

    /// Hands the screen back to the home screen.
    pub fn release(&mut self) {
        self.pages.clear();

        debug!("releasing gui");

        self.emitter.emit(Message::new(
            "mycroft.gui.screen.close",
            json!({ "skill_id": self.skill_id }),
        ));
    }

    fn page_url(&self, name: &str) -> String {
        match &self.ui_directory {
            Some(dir) => format!("file://{}", dir.join(name).display()),
            None => name.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(ui: Option<&str>) -> (GuiSession, flume::Receiver<Message>) {
        let (emitter, rx) = Emitter::channel();
        (
            GuiSession::new("skill-test", ui.map(PathBuf::from), emitter),
            rx,
        )
    }

    fn drain(rx: &flume::Receiver<Message>) -> Vec<Message> {
        rx.drain().collect()
    }

    #[test]
    fn set_without_page_is_kept_locally() {
        let (mut gui, rx) = session(None);

        gui.set("singleshot_mode", false);

        assert_eq!(gui.get("singleshot_mode"), Some(&json!(false)));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn show_page_syncs_values_then_shows() {
        let (mut gui, rx) = session(None);
        gui.set("save_path", "/tmp/pics");

        gui.show_page("Camera.qml", Some(60));

        let msgs = drain(&rx);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].msg_type, "gui.value.set");
        assert_eq!(msgs[0].data["save_path"], json!("/tmp/pics"));
        assert_eq!(msgs[0].data["__from"], json!("skill-test"));
        assert_eq!(msgs[1].msg_type, "gui.page.show");
        assert_eq!(msgs[1].data["page"], json!(["Camera.qml"]));
        assert_eq!(msgs[1].data["page_names"], json!(["Camera.qml"]));
        assert_eq!(msgs[1].data["index"], json!(0));
        assert_eq!(msgs[1].data["__idle"], json!(60));
        assert_eq!(gui.pages(), ["Camera.qml"]);
    }

    #[test]
    fn set_while_page_is_shown_is_sent_immediately() {
        let (mut gui, rx) = session(None);
        gui.show_page("Camera.qml", None);
        drain(&rx);

        gui.set("singleshot_mode", true);

        let msgs = drain(&rx);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].msg_type, "gui.value.set");
        assert_eq!(msgs[0].data["singleshot_mode"], json!(true));
    }

    #[test]
    fn showing_the_same_page_twice_does_not_duplicate_it() {
        let (mut gui, rx) = session(None);

        gui.show_page("Camera.qml", None);
        gui.show_page("Camera.qml", None);

        assert_eq!(gui.pages(), ["Camera.qml"]);
        let last = drain(&rx).pop().unwrap();
        assert_eq!(last.data["page"], json!(["Camera.qml"]));
        assert_eq!(last.data["__idle"], Value::Null);
    }

    #[test]
    fn page_urls_use_ui_directory() {
        let (mut gui, rx) = session(Some("/opt/camera/ui"));

        gui.show_page("Camera.qml", None);

        let show = drain(&rx).pop().unwrap();
        assert_eq!(show.data["page"], json!(["file:///opt/camera/ui/Camera.qml"]));
        assert_eq!(show.data["page_names"], json!(["Camera.qml"]));
    }

    #[test]
    fn remove_and_release_are_always_sent() {
        let (mut gui, rx) = session(None);

        gui.remove_page("Camera.qml");
        gui.release();

        let types: Vec<_> = drain(&rx).into_iter().map(|m| m.msg_type).collect();
        assert_eq!(types, ["gui.page.delete", "mycroft.gui.screen.close"]);
    }

    #[test]
    fn release_forgets_pages() {
        let (mut gui, _rx) = session(None);
        gui.show_page("Camera.qml", None);

        gui.release();

        assert!(gui.pages().is_empty());
    }
}
