use std::path::{Path, PathBuf};

use cs_bus::Message;
use cs_skill::{HandlerRegistry, RuntimeRequirements, Skill, SkillContext};

use crate::{ensure_folder, locale, CameraConfig, CameraMode, CameraStatus};

pub const CAMERA_PAGE: &str = "Camera.qml";

/// GUI key holding the folder the page saves photos into.
pub const SAVE_PATH_KEY: &str = "save_path";

/// GUI key telling the page whether to take one photo and return.
pub const SINGLESHOT_KEY: &str = "singleshot_mode";

/// Sent by the home screen's camera button.
pub const HOMEPAGE_EVENT: &str = "skill-camera.openvoiceos.homepage";

pub const VIEWPORT_STATUS_EVENT: &str = "CameraSkill.ViewPortStatus";
pub const END_PROCESS_EVENT: &str = "CameraSkill.EndProcess";

/// Opens the camera page on request, either as a live preview or to take a
/// single photo, and closes it when the page says it is done.
pub struct CameraSkill {
    config: CameraConfig,
    save_folder: Option<PathBuf>,
    /// `None` while the camera page isn't in use.
    mode: Option<CameraMode>,
}

impl CameraSkill {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            save_folder: None,
            mode: None,
        }
    }

    pub fn mode(&self) -> Option<CameraMode> {
        self.mode
    }

    pub fn save_folder(&self) -> Option<&Path> {
        self.save_folder.as_deref()
    }

    /// Opens the camera page to take one photo.
    pub fn take_single_photo(&mut self, ctx: &mut SkillContext<'_>) {
        self.handle_camera_activity(CameraMode::Singleshot, ctx);
    }

    /// Opens the camera page in live view mode.
    pub fn open_camera_app(&mut self, ctx: &mut SkillContext<'_>) {
        self.handle_camera_activity(CameraMode::Generic, ctx);
    }

    /// Mirrors a status tag from the camera page. Tags we don't know are
    /// ignored.
    pub fn handle_camera_status(&mut self, tag: Option<&str>, ctx: &mut SkillContext<'_>) {
        let Some(status) = tag.and_then(CameraStatus::parse) else {
            debug!("ignoring camera status {:?}", tag);
            return;
        };

        let mode = status.mode();
        debug!("camera page reports {:?}, now in {} mode", status, mode);

        self.mode = Some(mode);
        ctx.gui.set(SINGLESHOT_KEY, mode.is_singleshot());
    }

    /// Closes the camera page and gives the screen back.
    pub fn handle_camera_completed(&mut self, ctx: &mut SkillContext<'_>) {
        self.mode = None;
        ctx.gui.remove_page(CAMERA_PAGE);
        ctx.gui.release();
    }

    fn handle_camera_activity(&mut self, mode: CameraMode, ctx: &mut SkillContext<'_>) {
        info!("opening camera in {} mode", mode);

        if let Some(folder) = &self.save_folder {
            ctx.gui
                .set(SAVE_PATH_KEY, folder.to_string_lossy().into_owned());
        }
        ctx.gui.set(SINGLESHOT_KEY, mode.is_singleshot());
        self.mode = Some(mode);

        ctx.gui.show_page(CAMERA_PAGE, Some(self.config.idle_timeout));
    }

    fn handle_capture_single_shot(&mut self, _: &Message, ctx: &mut SkillContext<'_>) {
        ctx.speak_dialog("acknowledge");
        ctx.gui.set(SINGLESHOT_KEY, false);
        self.take_single_photo(ctx);
    }

    fn handle_open_camera(&mut self, _: &Message, ctx: &mut SkillContext<'_>) {
        ctx.speak_dialog("acknowledge");
        ctx.gui.set(SINGLESHOT_KEY, false);
        self.open_camera_app(ctx);
    }

    fn on_viewport_status(&mut self, message: &Message, ctx: &mut SkillContext<'_>) {
        self.handle_camera_status(message.data_str("status"), ctx);
    }

    fn on_end_process(&mut self, _: &Message, ctx: &mut SkillContext<'_>) {
        self.handle_camera_completed(ctx);
    }

    fn api_take_single_photo(&mut self, _: &Message, ctx: &mut SkillContext<'_>) {
        self.take_single_photo(ctx);
    }

    fn api_open_camera_app(&mut self, _: &Message, ctx: &mut SkillContext<'_>) {
        self.open_camera_app(ctx);
    }
}

impl Skill for CameraSkill {
    fn skill_id(&self) -> &str {
        &self.config.skill_id
    }

    fn name(&self) -> &'static str {
        "CameraSkill"
    }

    fn initialize(&mut self, registry: &mut HandlerRegistry<Self>) -> anyhow::Result<()> {
        let folder = self.config.resolve_save_folder()?;
        ensure_folder(&folder)?;
        info!("saving photos to {}", folder.display());
        self.save_folder = Some(folder);

        let lang = registry.lang().to_owned();

        registry.intent(
            "CaptureSingleShot.intent",
            locale::resource(&lang, "CaptureSingleShot.intent")?,
            "handle_capture_single_shot",
            Self::handle_capture_single_shot,
        );
        registry.intent(
            "OpenCamera.intent",
            locale::resource(&lang, "OpenCamera.intent")?,
            "handle_open_camera",
            Self::handle_open_camera,
        );
        registry.dialog("acknowledge", locale::resource(&lang, "acknowledge.dialog")?);

        registry.on(HOMEPAGE_EVENT, "handle_open_camera", Self::handle_open_camera);
        registry.on(
            VIEWPORT_STATUS_EVENT,
            "handle_camera_status",
            Self::on_viewport_status,
        );
        registry.on(
            END_PROCESS_EVENT,
            "handle_camera_completed",
            Self::on_end_process,
        );

        registry.api_method(
            "take_single_photo",
            "Take a single photo using the attached camera.",
            Self::api_take_single_photo,
        );
        registry.api_method(
            "open_camera_app",
            "Open the camera live view mode.",
            Self::api_open_camera_app,
        );

        Ok(())
    }

    fn stop(&mut self, ctx: &mut SkillContext<'_>) {
        self.handle_camera_completed(ctx);
    }

    // nothing to show without a screen
    fn runtime_requirements(&self) -> RuntimeRequirements {
        RuntimeRequirements {
            gui_before_load: true,
            requires_gui: true,
        }
    }
}
