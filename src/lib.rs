// Library exports for the procwatch process watchdog

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod process;
