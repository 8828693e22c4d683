use std::collections::HashMap;

use cs_bus::Message;

use crate::{DialogSet, SkillContext};

/// A plain function that reacts to a bus message.
pub type Handler<S> = fn(&mut S, &Message, &mut SkillContext<'_>);

/// What a skill has to provide to be run by a [`SkillTask`](crate::SkillTask).
pub trait Skill: Send + Sized + 'static {
    /// Unique id on the bus, e.g. `skill-camera.openvoiceos`.
    fn skill_id(&self) -> &str;

    /// Human readable name, used in handler start/complete notifications.
    fn name(&self) -> &'static str;

    /// Called once before the skill sees any message. Registers every
    /// handler, intent, API method and dialog the skill needs.
    fn initialize(&mut self, registry: &mut HandlerRegistry<Self>) -> anyhow::Result<()>;

    /// Called when the assistant asks everything to stop.
    fn stop(&mut self, ctx: &mut SkillContext<'_>);

    /// What has to be up before the skill loads, and what it can't run
    /// without.
    fn runtime_requirements(&self) -> RuntimeRequirements {
        RuntimeRequirements::default()
    }
}

/// Conditions the dispatcher checks before loading a skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeRequirements {
    /// Wait for a connected GUI before registering intents.
    pub gui_before_load: bool,
    /// Unload when the GUI goes away, load again when it comes back.
    pub requires_gui: bool,
}

impl RuntimeRequirements {
    pub fn needs_gui(&self) -> bool {
        self.gui_before_load || self.requires_gui
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerKind {
    Event,
    Intent,
    Api,
}

pub(crate) struct HandlerEntry<S> {
    pub label: String,
    pub kind: HandlerKind,
    pub handler: Handler<S>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRegistration {
    pub file_name: String,
    /// Fully qualified name, `<skill_id>:<file_name>`. This is also the type
    /// of the message the intent service sends when the intent matches.
    pub name: String,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiMethod {
    pub name: String,
    pub help: String,
    /// Message type that invokes the method, `<skill_id>.<name>`.
    pub msg_type: String,
}

/// Everything a skill registers during [`Skill::initialize`].
pub struct HandlerRegistry<S> {
    skill_id: String,
    lang: String,
    handlers: HashMap<String, Vec<HandlerEntry<S>>>,
    intents: Vec<IntentRegistration>,
    api: Vec<ApiMethod>,
    dialogs: DialogSet,
}

impl<S> HandlerRegistry<S> {
    pub fn new(skill_id: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            lang: lang.into(),
            handlers: HashMap::new(),
            intents: Vec::new(),
            api: Vec::new(),
            dialogs: DialogSet::default(),
        }
    }

    /// Language the skill should load its locale resources for.
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Runs `handler` for every message of type `event`. GUI events arrive
    /// this way too.
    pub fn on(&mut self, event: impl Into<String>, label: &str, handler: Handler<S>) {
        self.push(event.into(), label, HandlerKind::Event, handler);
    }

    /// Registers an intent from its sample utterances.
    pub fn intent(&mut self, file_name: &str, samples: Vec<String>, label: &str, handler: Handler<S>) {
        let name = format!("{}:{}", self.skill_id, file_name);

        if samples.is_empty() {
            warn!("intent {} has no samples", name);
        }

        self.intents.push(IntentRegistration {
            file_name: file_name.to_owned(),
            name: name.clone(),
            samples,
        });
        self.push(name, label, HandlerKind::Intent, handler);
    }

    /// Exposes a method to other skills. Callers get a `.response` once the
    /// handler has run.
    pub fn api_method(&mut self, name: &str, help: &str, handler: Handler<S>) {
        let msg_type = format!("{}.{}", self.skill_id, name);

        self.api.push(ApiMethod {
            name: name.to_owned(),
            help: help.to_owned(),
            msg_type: msg_type.clone(),
        });
        self.push(msg_type, name, HandlerKind::Api, handler);
    }

    pub fn dialog(&mut self, name: &str, lines: Vec<String>) {
        self.dialogs.insert(name, lines);
    }

    pub fn intents(&self) -> &[IntentRegistration] {
        &self.intents
    }

    pub fn api_methods(&self) -> &[ApiMethod] {
        &self.api
    }

    pub fn handles(&self, msg_type: &str) -> bool {
        self.handlers.contains_key(msg_type)
    }

    pub(crate) fn handlers(&self, msg_type: &str) -> &[HandlerEntry<S>] {
        self.handlers.get(msg_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn dialogs_mut(&mut self) -> &mut DialogSet {
        &mut self.dialogs
    }

    fn push(&mut self, msg_type: String, label: &str, kind: HandlerKind, handler: Handler<S>) {
        trace!("registering {} for {}", label, msg_type);

        self.handlers.entry(msg_type).or_default().push(HandlerEntry {
            label: label.to_owned(),
            kind,
            handler,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    fn noop(_: &mut Dummy, _: &Message, _: &mut SkillContext<'_>) {}

    #[test]
    fn intent_names_are_qualified_with_skill_id() {
        let mut registry = HandlerRegistry::<Dummy>::new("skill-x", "en-us");

        registry.intent("Open.intent", vec!["open".into()], "handle_open", noop);

        assert_eq!(registry.intents()[0].name, "skill-x:Open.intent");
        assert!(registry.handles("skill-x:Open.intent"));
        assert_eq!(registry.handlers("skill-x:Open.intent")[0].kind, HandlerKind::Intent);
    }

    #[test]
    fn api_methods_listen_on_dotted_type() {
        let mut registry = HandlerRegistry::<Dummy>::new("skill-x", "en-us");

        registry.api_method("snap", "take a picture", noop);

        assert_eq!(registry.api_methods()[0].msg_type, "skill-x.snap");
        assert!(registry.handles("skill-x.snap"));
    }

    #[test]
    fn one_event_can_have_several_handlers() {
        let mut registry = HandlerRegistry::<Dummy>::new("skill-x", "en-us");

        registry.on("mycroft.ready", "a", noop);
        registry.on("mycroft.ready", "b", noop);

        let labels: Vec<_> = registry
            .handlers("mycroft.ready")
            .iter()
            .map(|h| h.label.as_str())
            .collect();
        assert_eq!(labels, ["a", "b"]);
        assert!(registry.handlers("unknown").is_empty());
    }
}
