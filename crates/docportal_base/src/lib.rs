/* 📖 # Why have docportal_base as a core library?
docportal_base provides the error type, tracing setup and the platform
abstraction layer used across all crates. Keeping them here prevents circular
dependencies between the engine and the CLI.
*/

pub mod error;
pub mod pal;
mod pal_tests;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, PortalError, PortalResult, ResultExt};
pub use pal::{DirEntry, FilePath, MockPal, Pal, PalHandle, RealPal};
