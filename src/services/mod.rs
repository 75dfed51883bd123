pub mod commands;
pub mod dispatcher;
pub mod refresher;

pub use commands::{CommandSpec, COMMANDS};
pub use dispatcher::{Command, Dispatcher, Outcome, COMMAND_PREFIX, NOT_READY_MESSAGE};
pub use refresher::{CycleReport, Refresher, RefresherHandle};
