use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Settings for the drawing session and the square driver. Every field may be
/// omitted from the JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub device: PathBuf,
    /// Terminal to read keys from; standard input when unset.
    pub tty: Option<PathBuf>,
    pub echo: bool,
    pub key_timeout_ms: u64,
    pub frame_delay_ms: u64,
    pub square_size: u32,
    pub step: u32,
    pub square_color: Color,
    pub background: Color,
    pub text_color: Color,
    pub dump_directory: PathBuf,
}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Serde(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Default for Config {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/fb0"),
            tty: None,
            echo: false,
            key_timeout_ms: 0,
            frame_delay_ms: 20,
            square_size: 20,
            step: 10,
            square_color: Color::RED,
            background: Color::BLACK,
            text_color: Color::BLUE,
            dump_directory: PathBuf::from("./dumps"),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read(path).map_err(Error::Io)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json).map_err(Error::Serde)
    }

    pub fn key_timeout(&self) -> Duration {
        Duration::from_millis(self.key_timeout_ms)
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(error) => write!(f, "cannot read config: {}", error),
            Error::Serde(error) => write!(f, "invalid config: {}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            Error::Serde(error) => Some(error),
        }
    }
}
