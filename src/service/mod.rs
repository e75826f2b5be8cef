//! Service layer module.
//!
//! Contains the ID generation pipeline and settings management.

pub mod counter;
pub mod formatter;
pub mod generator;
pub mod pattern;
pub mod settings;

pub use counter::SequenceCounter;
pub use formatter::{FormatError, Formatter};
pub use generator::IdGenerator;
pub use pattern::{PatternTemplate, ResolvedPattern};
pub use settings::{SettingsService, TenantPage};
