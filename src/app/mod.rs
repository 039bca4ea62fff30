mod commands;
mod input;
mod output;
mod runtime;

pub use commands::{list_shells, set_config, set_trust, show_config, tabs_command, trust_status, ConfigChanges, TabCommand};
pub use runtime::{run_attached, AttachOptions};
