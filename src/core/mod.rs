//! Configuration model shared by every pipeline stage.

pub mod command;
pub mod layout;
pub mod settings;
pub mod status;

pub use command::CommandLine;
pub use layout::ProjectPaths;
pub use settings::{BuildSettings, BuildVariant, ToolLocations};
pub use status::StatusCode;
