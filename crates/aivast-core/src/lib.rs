//! Domain layer of the AIVAST client.
//!
//! Holds the types shared by every layer: identifiers, the submission
//! [`mode`], scan and session payloads, the autonomous-scan [`directive`]
//! parser, and the traits for the backend and the rendering surface.

pub mod backend;
pub mod config;
pub mod directive;
pub mod error;
pub mod ids;
pub mod mode;
pub mod render;
pub mod scan;
pub mod session;

// Re-export common types
pub use backend::ScanBackend;
pub use config::{ClientConfig, OrphanPolicy};
pub use error::{AivastError, Result};
pub use ids::{ScanId, SessionId};
pub use mode::{Mode, ModeSelector, Tool};
