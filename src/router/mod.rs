//! Single dispatch point for messages arriving from content scripts, the
//! side panel and other extension pages.

mod handlers;
pub mod message;

pub use message::{Envelope, Response, Sender};

use crate::background::Background;
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenPanelFromContent,
    ClosePanel,
    PanelClosed,
    StoreTranscript,
    GetTranscript,
    GetPanelState,
    ValidateLicense,
    GetLicenseStatus,
    ClearLicense,
    GetPromptVariants,
    GetCustomVariants,
    SaveCustomVariant,
    DeleteCustomVariant,
    GetPreferences,
    SavePreferences,
    BuildPrompt,
}

/// Wire name to action. Anything not listed here belongs to other code
/// sharing the channel.
const ROUTES: &[(&str, Action)] = &[
    ("open-panel-from-content", Action::OpenPanelFromContent),
    ("close-panel", Action::ClosePanel),
    ("panel-closed", Action::PanelClosed),
    ("store-transcript", Action::StoreTranscript),
    ("get-transcript", Action::GetTranscript),
    ("get-panel-state", Action::GetPanelState),
    ("validate-license", Action::ValidateLicense),
    ("get-license-status", Action::GetLicenseStatus),
    ("clear-license", Action::ClearLicense),
    ("get-prompt-variants", Action::GetPromptVariants),
    ("get-custom-variants", Action::GetCustomVariants),
    ("save-custom-variant", Action::SaveCustomVariant),
    ("delete-custom-variant", Action::DeleteCustomVariant),
    ("get-preferences", Action::GetPreferences),
    ("save-preferences", Action::SavePreferences),
    ("build-prompt", Action::BuildPrompt),
];

impl Action {
    pub fn from_name(name: &str) -> Option<Self> {
        ROUTES
            .iter()
            .find(|(route, _)| *route == name)
            .map(|(_, action)| *action)
    }

    pub fn name(self) -> &'static str {
        ROUTES
            .iter()
            .find(|(_, action)| *action == self)
            .map(|(route, _)| *route)
            .unwrap_or("unknown")
    }

    /// Panel and tab-cache actions touch neither storage nor the network.
    /// They run on the event loop itself, in arrival order, so a panel open
    /// reaches the host before the next event is read.
    pub fn runs_inline(self) -> bool {
        matches!(
            self,
            Action::OpenPanelFromContent
                | Action::ClosePanel
                | Action::PanelClosed
                | Action::StoreTranscript
                | Action::GetTranscript
                | Action::GetPanelState
        )
    }
}

/// Routes one message to its handler.
///
/// Returns `None` for actions this router does not own; the sender gets no
/// reply. Handler errors become `{success: false, error}`. Nothing is awaited
/// before the handler starts, so a panel open requested from a user gesture
/// reaches the host within that gesture.
pub async fn dispatch(background: &Background, envelope: Envelope) -> Option<Response> {
    let Some(action) = Action::from_name(&envelope.action) else {
        log_debug!("Ignoring unrouted action '{}'", envelope.action);
        return None;
    };

    let outcome = handlers::handle(background, action, envelope.payload, &envelope.sender).await;
    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            log_warn!("Action '{}' failed: {:#}", action.name(), err);
            Response::failure(&err)
        }
    };

    Some(response)
}
