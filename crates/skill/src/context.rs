use cs_bus::{Emitter, Message};
use serde_json::{json, Map};

use crate::{DialogSet, GuiSession};

/// Handed to every handler. Gives access to the GUI session and lets the
/// handler talk back on the bus in reply to the message being handled.
pub struct SkillContext<'a> {
    pub gui: &'a mut GuiSession,
    skill_id: &'a str,
    lang: &'a str,
    emitter: &'a Emitter,
    dialogs: &'a mut DialogSet,
    message: Option<&'a Message>,
}

impl<'a> SkillContext<'a> {
    pub fn new(
        skill_id: &'a str,
        lang: &'a str,
        emitter: &'a Emitter,
        gui: &'a mut GuiSession,
        dialogs: &'a mut DialogSet,
        message: Option<&'a Message>,
    ) -> Self {
        Self {
            gui,
            skill_id,
            lang,
            emitter,
            dialogs,
            message,
        }
    }

    pub fn speak_dialog(&mut self, name: &str) {
        self.speak_dialog_with(name, &Map::new());
    }

    /// Speaks the next line of dialog `name`, filling its placeholders from
    /// `data`. The `speak` message is forwarded from the message being
    /// handled so it reaches the same client.
    pub fn speak_dialog_with(&mut self, name: &str, data: &Map<String, serde_json::Value>) {
        let utterance = self.dialogs.render(name, data);
        debug!("speak: {}", utterance);

        let payload = json!({
            "utterance": utterance,
            "expect_response": false,
            "lang": self.lang,
            "meta": {
                "dialog": name,
                "data": data,
                "skill": self.skill_id,
            },
        });

        let message = match self.message {
            Some(origin) => origin.forward("speak", payload),
            None => Message::new("speak", payload),
        };

        self.emitter.emit(message);
    }
}
