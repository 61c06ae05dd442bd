pub mod auth;
pub mod client;
pub mod executor;
pub mod google;
pub mod openai_compat;
pub mod registry;
pub mod title;
pub mod traits;
pub(crate) mod sse;
pub(crate) mod util;

// Re-exports for convenience.
pub use auth::{Credential, CredentialPool, RotationCursor};
pub use client::ChatClient;
pub use executor::KeyRotationExecutor;
pub use registry::build_provider;
pub use title::TitleGenerator;
pub use traits::{ChatProvider, ChatResponse, ModelInfo};
