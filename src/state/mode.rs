use crate::menu::MenuNavigator;
use crate::pin::{Arming, Capture};
use crate::software::SoftwareItem;

/// Top-level device mode. Exactly one is active; only the controller holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeState {
    /// Idle animation
    Ambient,
    /// Home held, waiting for the arming threshold
    Arming(Arming),
    /// Armed; PIN window pending or open
    PinCapture(Capture),
    DownloadMenu(MenuNavigator),
    ExecuteMenu(MenuNavigator),
    Downloading(SoftwareItem),
    Executing(SoftwareItem),
}

impl ModeState {
    pub fn name(&self) -> &'static str {
        match self {
            ModeState::Ambient => "ambient",
            ModeState::Arming(_) => "arming",
            ModeState::PinCapture(_) => "pin-capture",
            ModeState::DownloadMenu(_) => "download-menu",
            ModeState::ExecuteMenu(_) => "execute-menu",
            ModeState::Downloading(_) => "downloading",
            ModeState::Executing(_) => "executing",
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self, ModeState::Ambient)
    }

    /// Menus poll at the slower menu rate
    pub fn is_menu(&self) -> bool {
        matches!(self, ModeState::DownloadMenu(_) | ModeState::ExecuteMenu(_))
    }

    pub fn menu(&self) -> Option<&MenuNavigator> {
        match self {
            ModeState::DownloadMenu(menu) | ModeState::ExecuteMenu(menu) => Some(menu),
            _ => None,
        }
    }
}
