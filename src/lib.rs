pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod epd_driver;
pub mod format;
pub mod gauge;
pub mod panel;
pub mod telemetry;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("bus error: {0}")]
    Bus(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("timed out: {0}")]
    Timeout(String),
}
