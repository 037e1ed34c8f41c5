pub mod attach;
pub mod error;
pub mod events;
pub mod loader;
pub mod object;
pub mod pin;
pub mod stats;
pub mod tables;

pub use attach::{AttachMode, ForcedMode};
pub use error::{LoaderError, Result};
pub use events::{EventConsumer, FilterLogRecord};
pub use loader::FirewallLoader;
pub use object::ObjectSource;
pub use stats::{StatsReader, StatsReport};
