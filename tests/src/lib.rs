mod exec_log;
pub use exec_log::ExecLog;

pub mod fixtures;

mod logging_driver;
pub use logging_driver::{DriverOp, LoggingDriver};

pub mod prelude;

pub use std_util::*;
