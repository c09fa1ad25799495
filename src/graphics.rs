//! The drawing session: a mapped framebuffer plus a raw-mode terminal.
//!
//! `Graphics::init` acquires everything and the value owns it from then on;
//! dropping it (or calling [`Graphics::shutdown`]) restores the terminal and
//! releases the mapping and the device.

use std::{fmt, io, path::PathBuf, time::Duration};

use log::info;
use nix::errno::Errno;

use crate::{
    color::Color,
    config::Config,
    framebuffer::{Framebuffer, MappedMemory},
    surface::{LayoutError, Surface},
    terminal::{Console, InputMode, RawTerminal},
};

#[derive(Debug)]
pub enum Error {
    /// The framebuffer device could not be opened.
    Open(PathBuf, io::Error),
    /// The device refused a screen info query.
    Query(Errno),
    /// The device memory could not be mapped.
    Map(Errno),
    UnsupportedDepth(u32),
    /// The reported geometry does not fit the mapped memory.
    Layout(LayoutError),
    /// Raw mode could not be entered or left.
    Terminal(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct Graphics {
    framebuffer: Framebuffer,
    terminal: RawTerminal,
}

impl Graphics {
    pub fn init(config: &Config) -> Result<Self> {
        let framebuffer = Framebuffer::open(&config.device)?;

        let disable = if config.echo {
            InputMode::CANONICAL
        } else {
            InputMode::all()
        };
        let terminal = match &config.tty {
            Some(path) => RawTerminal::open(path, disable),
            None => RawTerminal::stdin(disable),
        }
        .map_err(Error::Terminal)?;
        terminal.clear_screen().map_err(Error::Terminal)?;

        info!("Graphics initialised on {}", config.device.display());
        Ok(Self {
            framebuffer,
            terminal,
        })
    }

    /// Restores the terminal and releases the framebuffer. Unlike dropping
    /// the session, a failure to restore the terminal is reported.
    pub fn shutdown(mut self) -> Result<()> {
        self.terminal.restore().map_err(Error::Terminal)
    }

    pub fn surface(&self) -> &Surface<MappedMemory> {
        self.framebuffer.surface()
    }

    pub fn surface_mut(&mut self) -> &mut Surface<MappedMemory> {
        self.framebuffer.surface_mut()
    }

    pub fn console(&self) -> &RawTerminal {
        &self.terminal
    }

    /// Borrows the drawing surface and the console at the same time.
    pub fn split(&mut self) -> (&mut Surface<MappedMemory>, &RawTerminal) {
        (self.framebuffer.surface_mut(), &self.terminal)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.surface_mut().set_pixel(x, y, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        self.surface_mut().fill_rect(x, y, width, height, color);
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        self.surface_mut().draw_rect(x, y, width, height, color);
    }

    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        self.surface_mut().draw_text(x, y, text, color);
    }

    pub fn clear_screen(&self) -> io::Result<()> {
        self.terminal.clear_screen()
    }

    pub fn read_key(&self, timeout: Duration) -> io::Result<Option<u8>> {
        self.terminal.read_key(timeout)
    }

    pub fn sleep_ms(&self, ms: u64) {
        self.terminal.sleep(Duration::from_millis(ms));
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Open(path, error) => write!(f, "cannot open {}: {}", path.display(), error),
            Error::Query(errno) => write!(f, "cannot query screen info: {}", errno),
            Error::Map(errno) => write!(f, "cannot map framebuffer memory: {}", errno),
            Error::UnsupportedDepth(bits) => {
                write!(f, "unsupported depth of {} bits per pixel", bits)
            }
            Error::Layout(error) => write!(f, "unusable framebuffer layout: {}", error),
            Error::Terminal(error) => write!(f, "cannot configure terminal: {}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open(_, error) | Error::Terminal(error) => Some(error),
            Error::Query(errno) | Error::Map(errno) => Some(errno),
            Error::Layout(error) => Some(error),
            Error::UnsupportedDepth(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_on_missing_device_fails_before_touching_the_terminal() {
        let config = Config {
            device: "/nonexistent/fb0".into(),
            // would fail too, so reaching the terminal step would change the error
            tty: Some("/nonexistent/tty".into()),
            ..Config::default()
        };
        match Graphics::init(&config) {
            Err(Error::Open(path, error)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/fb0"));
                assert_eq!(error.kind(), io::ErrorKind::NotFound);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("init succeeded on a missing device"),
        }
    }

    #[test]
    fn errors_describe_their_cause() {
        assert_eq!(
            Error::UnsupportedDepth(24).to_string(),
            "unsupported depth of 24 bits per pixel"
        );
        assert_eq!(
            Error::Layout(LayoutError::UnsupportedPixelSize(3)).to_string(),
            "unusable framebuffer layout: unsupported pixel size of 3 bytes"
        );
        assert!(Error::Map(Errno::ENOMEM)
            .to_string()
            .starts_with("cannot map framebuffer memory"));
    }
}
