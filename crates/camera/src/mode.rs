use std::fmt::Display;

/// What the camera page is doing while it is open.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CameraMode {
    /// Live preview, the user takes pictures with the on-screen button.
    Generic,
    /// Take one picture, then return.
    Singleshot,
}

impl CameraMode {
    pub fn is_singleshot(self) -> bool {
        self == CameraMode::Singleshot
    }
}

impl Display for CameraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraMode::Generic => write!(f, "generic"),
            CameraMode::Singleshot => write!(f, "singleshot"),
        }
    }
}

/// Status reported by the camera page.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CameraStatus {
    Generic,
    ImageTaken,
    Singleshot,
}

impl CameraStatus {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "generic" => Some(Self::Generic),
            "imagetaken" => Some(Self::ImageTaken),
            "singleshot" => Some(Self::Singleshot),
            _ => None,
        }
    }

    /// The mode the page is in after reporting this status. A taken image
    /// drops back to the live preview.
    pub fn mode(self) -> CameraMode {
        match self {
            Self::Singleshot => CameraMode::Singleshot,
            Self::Generic | Self::ImageTaken => CameraMode::Generic,
        }
    }
}
