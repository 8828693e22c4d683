use anyhow::{bail, Context};
use async_trait::async_trait;
use cs_bus::{BusEvent, Emitter, Message};
use cs_client::{command_channel, ChannelCommandSink, ChannelCommandSource, Task};
use serde_json::{json, Map, Value};
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    skill::HandlerKind, GuiSession, HandlerRegistry, RuntimeRequirements, Skill, SkillConfig,
    SkillContext, SkillRequest, SkillResponse,
};

const GUI_STATUS_REQUEST: &str = "gui.status.request";
const GUI_AVAILABLE: &str = "mycroft.gui.available";
const GUI_UNAVAILABLE: &str = "mycroft.gui.unavailable";

/// Initializes `skill` and wraps it in a task that feeds it bus events.
pub fn create_task<S: Skill>(
    mut skill: S,
    config: SkillConfig,
    emitter: Emitter,
    events: flume::Receiver<BusEvent>,
) -> anyhow::Result<SkillTask<S>> {
    let skill_id = skill.skill_id().to_owned();
    let mut registry = HandlerRegistry::new(skill_id.clone(), config.lang.clone());

    skill
        .initialize(&mut registry)
        .with_context(|| format!("failed to initialize {}", skill_id))?;

    info!(
        "initialized {} with {} intents and {} api methods",
        skill_id,
        registry.intents().len(),
        registry.api_methods().len()
    );

    let requirements = skill.runtime_requirements();
    let gui = GuiSession::new(skill_id.clone(), config.ui_directory, emitter.clone());
    let (cmd_tx, cmd_rx) = command_channel();

    Ok(SkillTask {
        skill,
        skill_id,
        lang: config.lang,
        requirements,
        loaded: false,
        registry,
        gui,
        emitter,
        events,
        cmd_tx,
        cmd_rx,
    })
}

/// The dispatcher. Owns the skill and hands it one message at a time.
pub struct SkillTask<S: Skill> {
    skill: S,
    skill_id: String,
    lang: String,
    requirements: RuntimeRequirements,
    /// Whether our intents are registered and bus messages reach the skill.
    loaded: bool,
    registry: HandlerRegistry<S>,
    gui: GuiSession,
    emitter: Emitter,
    events: flume::Receiver<BusEvent>,
    cmd_tx: ChannelCommandSink<SkillRequest, SkillResponse>,
    cmd_rx: ChannelCommandSource<SkillRequest, SkillResponse>,
}

impl<S: Skill> SkillTask<S> {
    pub fn cmd(&self) -> ChannelCommandSink<SkillRequest, SkillResponse> {
        self.cmd_tx.clone()
    }

    pub fn skill(&self) -> &S {
        &self.skill
    }

    pub fn gui(&self) -> &GuiSession {
        &self.gui
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Reacts to one event from the bus task. Messages only reach the skill
    /// while it is loaded; GUI availability decides when that is for skills
    /// that need a GUI.
    pub fn handle_event(&mut self, event: BusEvent) {
        match event {
            // the intent service may have restarted with the bus, so load
            // from scratch on every connection
            BusEvent::Connected => {
                self.loaded = false;

                if self.requirements.needs_gui() {
                    debug!("asking for gui status before loading {}", self.skill_id);
                    self.emitter.emit(Message::new(GUI_STATUS_REQUEST, json!({})));
                } else {
                    self.register();
                }
            }
            BusEvent::Message(message) => {
                let msg_type = message.msg_type.as_str();

                if msg_type == format!("{}.response", GUI_STATUS_REQUEST) {
                    let connected = message
                        .data
                        .get("connected")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    self.gui_changed(connected);
                } else if msg_type == GUI_AVAILABLE {
                    self.gui_changed(true);
                } else if msg_type == GUI_UNAVAILABLE {
                    self.gui_changed(false);
                } else if self.loaded {
                    self.dispatch(&message);
                } else {
                    trace!("{} is not loaded, ignoring {}", self.skill_id, msg_type);
                }
            }
        }
    }

    fn gui_changed(&mut self, connected: bool) {
        if !self.requirements.needs_gui() {
            return;
        }

        match (connected, self.loaded) {
            (true, false) => {
                info!("gui is available, loading {}", self.skill_id);
                self.register();
            }
            (false, true) if self.requirements.requires_gui => {
                info!("gui is gone, unloading {}", self.skill_id);
                self.unload();
            }
            (false, false) => {
                info!("{} is waiting for a gui", self.skill_id);
            }
            _ => {}
        }
    }

    /// Stops the skill and takes its intents off the bus. It keeps its state
    /// and loads again once the GUI is back.
    fn unload(&mut self) {
        self.stop(None);
        self.emitter.emit(self.detach_message());
        self.loaded = false;
    }

    fn detach_message(&self) -> Message {
        Message::new(
            "detach_skill",
            json!({ "skill_id": format!("{}:", self.skill_id) }),
        )
    }

    /// Tells the bus about our intents and marks the skill loaded.
    pub fn register(&mut self) {
        for intent in self.registry.intents() {
            debug!("registering intent {}", intent.name);

            self.emitter.emit(Message::new(
                "padatious:register_intent",
                json!({
                    "file_name": intent.file_name,
                    "name": intent.name,
                    "lang": self.lang,
                    "samples": intent.samples,
                }),
            ));
        }

        self.emitter.emit(Message::new(
            "mycroft.skills.loaded",
            json!({ "id": self.skill_id, "name": self.skill.name() }),
        ));

        self.loaded = true;
    }

    /// Runs the handlers for one message, whether or not the skill is
    /// loaded. Returns whether anything handled it.
    pub fn dispatch(&mut self, message: &Message) -> bool {
        let msg_type = message.msg_type.as_str();

        if msg_type == "mycroft.stop" || msg_type == format!("{}.stop", self.skill_id) {
            self.stop(Some(message));
            return true;
        }

        if msg_type == format!("{}.public_api", self.skill_id) {
            self.emitter.emit(message.response(self.public_api()));
            return true;
        }

        let entries: Vec<_> = self
            .registry
            .handlers(msg_type)
            .iter()
            .map(|e| (e.label.clone(), e.kind, e.handler))
            .collect();

        for (label, kind, handler) in &entries {
            let qualified = format!("{}.{}", self.skill.name(), label);
            trace!("running {} for {}", qualified, msg_type);

            if *kind == HandlerKind::Intent {
                self.emitter.emit(message.forward(
                    "mycroft.skill.handler.start",
                    json!({ "name": qualified }),
                ));
            }

            {
                let mut ctx = SkillContext::new(
                    &self.skill_id,
                    &self.lang,
                    &self.emitter,
                    &mut self.gui,
                    self.registry.dialogs_mut(),
                    Some(message),
                );
                handler(&mut self.skill, message, &mut ctx);
            }

            match kind {
                HandlerKind::Intent => self.emitter.emit(message.forward(
                    "mycroft.skill.handler.complete",
                    json!({ "name": qualified }),
                )),
                HandlerKind::Api => self
                    .emitter
                    .emit(message.response(json!({ "result": Value::Null }))),
                HandlerKind::Event => {}
            }
        }

        !entries.is_empty()
    }

    pub fn stop(&mut self, origin: Option<&Message>) {
        debug!("stopping {}", self.skill_id);

        let mut ctx = SkillContext::new(
            &self.skill_id,
            &self.lang,
            &self.emitter,
            &mut self.gui,
            self.registry.dialogs_mut(),
            origin,
        );
        self.skill.stop(&mut ctx);
    }

    fn public_api(&self) -> Value {
        let api: Map<String, Value> = self
            .registry
            .api_methods()
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    json!({ "help": m.help, "type": m.msg_type, "signature": Value::Null }),
                )
            })
            .collect();

        Value::Object(api)
    }

    pub fn command(&mut self, request: SkillRequest) -> anyhow::Result<SkillResponse> {
        let local = json!({ "source": "cli", "destination": "skills" });

        let message = match request {
            SkillRequest::Intent { file_name } => {
                let msg_type = format!("{}:{}", self.skill_id, file_name);
                if !self.registry.handles(&msg_type) {
                    bail!("no intent named {}", file_name);
                }
                Message::new(msg_type, json!({}))
            }
            SkillRequest::Call { method } => {
                let msg_type = format!("{}.{}", self.skill_id, method);
                if !self.registry.handles(&msg_type) {
                    bail!("no api method named {}", method);
                }
                Message::new(msg_type, json!({}))
            }
            SkillRequest::Event { msg_type, status } => {
                let data = match status {
                    Some(status) => json!({ "status": status }),
                    None => json!({}),
                };
                Message::new(msg_type, data)
            }
            SkillRequest::Stop => {
                self.stop(None);
                return Ok(SkillResponse::Unit);
            }
            SkillRequest::Status => {
                return Ok(SkillResponse::Status {
                    values: self.gui.values().clone(),
                    pages: self.gui.pages().to_vec(),
                });
            }
        };

        let message = message.with_context(local);
        if !self.dispatch(&message) {
            warn!("nothing handles {}", message.msg_type);
        }

        Ok(SkillResponse::Unit)
    }
}

#[async_trait]
impl<S: Skill> Task for SkillTask<S> {
    fn name(&self) -> &'static str {
        "skill"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut this = *self;
        let events = this.events.clone();
        let cmd_rx = this.cmd_rx.clone();

        loop {
            select! {
                _ = cancel.cancelled() => break,

                evt = events.recv_async() => {
                    match evt {
                        Ok(evt) => this.handle_event(evt),
                        Err(_) => {
                            warn!("bus task is gone, exiting");
                            break;
                        }
                    }
                }

                cmd = cmd_rx.recv_async() => {
                    // we hold a sender ourselves, so this never fails
                    if let Ok((req, ret)) = cmd {
                        let _ = ret.send(this.command(req));
                    }
                }
            }
        }

        if this.loaded {
            this.emitter.emit(this.detach_message());
        }

        Ok(())
    }
}
