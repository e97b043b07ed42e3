pub mod config;
pub mod run;

pub use config::{ConfigAction, ConfigArgs};
pub use run::{MonitorArgs, MonitorKindArg, RunArgs, RunContext};
