//! Value Objects - Immutable, identity-less domain primitives

mod fingerprint;
mod generation_options;
mod model_id;
mod prompt;

pub use fingerprint::Fingerprint;
pub use generation_options::{GenerationOptions, ResponseFormat};
pub use model_id::ModelId;
pub use prompt::Prompt;
