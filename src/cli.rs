use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

const DEFAULT_STEP_FREQUENCY: u32 = 60;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Ocho: a CHIP-8 virtual machine that runs in the terminal.
pub struct Cli {
    /// Path of the program to load
    #[arg(value_name = "ROM")]
    pub rom: PathBuf,

    /// Sets the machine cycles executed per second
    #[arg(long, default_value_t = DEFAULT_STEP_FREQUENCY)]
    pub hz: u32,

    /// Enable logging
    #[arg(short, long, value_enum, value_name = "LEVEL")]
    pub log: Option<LogLevelOption>,
}

#[derive(ValueEnum, Clone, Copy)]
pub enum LogLevelOption {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevelOption {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevelOption::Trace => LevelFilter::Trace,
            LogLevelOption::Debug => LevelFilter::Debug,
            LogLevelOption::Info => LevelFilter::Info,
            LogLevelOption::Warn => LevelFilter::Warn,
            LogLevelOption::Error => LevelFilter::Error,
        }
    }
}
