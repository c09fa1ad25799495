use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    os::fd::AsFd,
    path::Path,
    thread,
    time::Duration,
};

use bitflags::bitflags;
use log::{debug, warn};
use nix::{
    errno::Errno,
    poll::{poll, PollFd, PollFlags},
    sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios},
};

pub const CLEAR_SCREEN: &[u8] = b"\x1b[2J";

bitflags! {
    /// Line discipline features that raw mode switches off.
    pub struct InputMode: u8 {
        const ECHO = 0b1 << 0;
        const CANONICAL = 0b1 << 1;
    }
}

impl InputMode {
    fn local_flags(self) -> LocalFlags {
        let mut flags = LocalFlags::empty();
        flags.set(LocalFlags::ECHO, self.contains(Self::ECHO));
        flags.set(LocalFlags::ICANON, self.contains(Self::CANONICAL));
        flags
    }
}

/// Keyboard, screen clearing and frame pacing as seen by a drawing loop.
pub trait Console {
    /// Waits at most `timeout` for a key. `Ok(None)` means nothing arrived.
    fn read_key(&self, timeout: Duration) -> io::Result<Option<u8>>;
    fn clear_screen(&self) -> io::Result<()>;
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

enum Output {
    Stdout,
    Terminal,
}

/// A terminal switched out of canonical/echo mode. The saved attributes are
/// put back exactly once, by [`RawTerminal::restore`] or on drop.
pub struct RawTerminal {
    tty: File,
    output: Output,
    saved: Option<Termios>,
}

impl RawTerminal {
    /// Takes over standard input; clear sequences go to standard output.
    pub fn stdin(disable: InputMode) -> io::Result<Self> {
        let tty = File::from(io::stdin().as_fd().try_clone_to_owned()?);
        Self::enter(tty, Output::Stdout, disable)
    }

    pub fn open(path: impl AsRef<Path>, disable: InputMode) -> io::Result<Self> {
        let tty = OpenOptions::new().read(true).write(true).open(path)?;
        Self::enter(tty, Output::Terminal, disable)
    }

    fn enter(tty: File, output: Output, disable: InputMode) -> io::Result<Self> {
        let saved = termios::tcgetattr(&tty)?;
        let mut raw = saved.clone();
        raw.local_flags.remove(disable.local_flags());
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&tty, SetArg::TCSANOW, &raw)?;
        debug!("Terminal entered raw mode ({:?} disabled)", disable);
        Ok(Self {
            tty,
            output,
            saved: Some(saved),
        })
    }

    pub fn restore(&mut self) -> io::Result<()> {
        if let Some(saved) = self.saved.take() {
            termios::tcsetattr(&self.tty, SetArg::TCSANOW, &saved)?;
            debug!("Terminal attributes restored");
        }
        Ok(())
    }
}

impl Console for RawTerminal {
    fn read_key(&self, timeout: Duration) -> io::Result<Option<u8>> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.tty.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, millis) {
            Ok(0) | Err(Errno::EINTR) => return Ok(None),
            Ok(_) => {}
            Err(errno) => return Err(errno.into()),
        }

        let mut key = [0; 1];
        match (&self.tty).read(&mut key) {
            Ok(1) => Ok(Some(key[0])),
            Ok(_) => Ok(None),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn clear_screen(&self) -> io::Result<()> {
        match self.output {
            Output::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(CLEAR_SCREEN)?;
                stdout.flush()
            }
            Output::Terminal => (&self.tty).write_all(CLEAR_SCREEN),
        }
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(error) = self.restore() {
            warn!("Failed to restore terminal attributes: {}", error);
        }
    }
}

/// A console that replays a fixed key script and records what was asked of it.
pub struct MockConsole {
    keys: RefCell<VecDeque<Option<u8>>>,
    clears: Cell<usize>,
    slept: Cell<Duration>,
}

impl MockConsole {
    pub fn new(keys: impl IntoIterator<Item = Option<u8>>) -> Self {
        Self {
            keys: RefCell::new(keys.into_iter().collect()),
            clears: Cell::new(0),
            slept: Cell::new(Duration::ZERO),
        }
    }

    /// Script from a string, one key per frame; `.` stands for "no key".
    pub fn from_script(script: &str) -> Self {
        Self::new(script.bytes().map(|key| (key != b'.').then_some(key)))
    }

    pub fn clears(&self) -> usize {
        self.clears.get()
    }

    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Console for MockConsole {
    fn read_key(&self, _: Duration) -> io::Result<Option<u8>> {
        self.keys.borrow_mut().pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "key script exhausted")
        })
    }

    fn clear_screen(&self) -> io::Result<()> {
        self.clears.set(self.clears.get() + 1);
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
    }
}
