pub mod license;
pub mod preferences;
pub mod transcript;
pub mod variant;

pub use license::{LicenseStatus, LicenseValidation, RemoteValidation};
pub use preferences::UserPreferences;
pub use transcript::{CachedTranscript, Cue, TabId, TranscriptPayload, WindowId};
pub use variant::{CustomVariant, CustomVariantInput, PromptVariant};
