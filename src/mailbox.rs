//! Client side of the kernel message queue (syscalls 443 and 444).

use std::{
    collections::{HashMap, VecDeque},
    ffi::{CStr, CString},
    fmt,
};

use int_enum::IntEnum;
use log::{debug, trace};
use nix::{errno::Errno, libc};

pub const SEND_SYSCALL: libc::c_long = 443;
pub const RECEIVE_SYSCALL: libc::c_long = 444;

pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_MESSAGE_LEN: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub body: String,
}

/// Outcome of one receive call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Receipt {
    Empty,
    Delivered { message: Message, more: bool },
}

/// Raw status returned by the receive syscall.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntEnum)]
pub enum ReceiveStatus {
    Empty = -1,
    Last = 0,
    More = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Recipient,
    Sender,
    Body,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    TooLong { field: Field, length: usize, limit: usize },
    InteriorNul(Field),
    /// The kernel refused to queue the message.
    Rejected(Errno),
    Receive(Errno),
    UnexpectedStatus(libc::c_long),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait Mailbox {
    fn send(&mut self, to: &str, body: &str, from: &str) -> Result<()>;
    fn receive(&mut self, user: &str) -> Result<Receipt>;
}

/// Receives until the mailbox reports that nothing remains.
pub fn drain(mailbox: &mut impl Mailbox, user: &str) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    loop {
        match mailbox.receive(user)? {
            Receipt::Empty => break,
            Receipt::Delivered { message, more } => {
                messages.push(message);
                if !more {
                    break;
                }
            }
        }
    }
    debug!("Drained {} message(s) for {}", messages.len(), user);
    Ok(messages)
}

fn check_length(field: Field, value: &str, limit: usize) -> Result<()> {
    if value.len() > limit {
        return Err(Error::TooLong {
            field,
            length: value.len(),
            limit,
        });
    }
    Ok(())
}

fn check_message(to: &str, body: &str, from: &str) -> Result<()> {
    check_length(Field::Recipient, to, MAX_USERNAME_LEN)?;
    check_length(Field::Sender, from, MAX_USERNAME_LEN)?;
    check_length(Field::Body, body, MAX_MESSAGE_LEN)
}

fn to_c_string(field: Field, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::InteriorNul(field))
}

/// Reads a NUL-terminated string out of a receive buffer. A buffer without a
/// terminator is taken whole, which truncates at the buffer size.
fn from_c_buffer(buffer: &[u8]) -> String {
    let bytes = CStr::from_bytes_until_nul(buffer)
        .map(CStr::to_bytes)
        .unwrap_or(buffer);
    String::from_utf8_lossy(bytes).into_owned()
}

/// The real mailbox, backed by the kernel.
#[derive(Default)]
pub struct KernelMailbox;

impl Mailbox for KernelMailbox {
    fn send(&mut self, to: &str, body: &str, from: &str) -> Result<()> {
        check_message(to, body, from)?;
        let to = to_c_string(Field::Recipient, to)?;
        let body = to_c_string(Field::Body, body)?;
        let from = to_c_string(Field::Sender, from)?;

        Errno::clear();
        let status =
            unsafe { libc::syscall(SEND_SYSCALL, to.as_ptr(), body.as_ptr(), from.as_ptr()) };
        let errno = Errno::last();
        trace!("send syscall returned {}", status);
        match status {
            0 => Ok(()),
            _ => Err(Error::Rejected(errno)),
        }
    }

    fn receive(&mut self, user: &str) -> Result<Receipt> {
        check_length(Field::Recipient, user, MAX_USERNAME_LEN)?;
        let user = to_c_string(Field::Recipient, user)?;
        let mut body = [0u8; MAX_MESSAGE_LEN + 1];
        let mut from = [0u8; MAX_USERNAME_LEN + 1];

        Errno::clear();
        let status = unsafe {
            libc::syscall(
                RECEIVE_SYSCALL,
                user.as_ptr(),
                body.as_mut_ptr(),
                from.as_mut_ptr(),
            )
        };
        let errno = Errno::last();
        trace!("receive syscall returned {}", status);
        receipt_from(status, errno, &mut body, &mut from)
    }
}

/// Decodes the result of a receive call. The C library turns the kernel's
/// "no messages" return into -1 with errno `EPERM`; any other errno with -1
/// is a real failure. Both buffers are NUL-terminated at their last byte
/// before decoding, so a full buffer is cut at its limit.
fn receipt_from(
    status: libc::c_long,
    errno: Errno,
    body: &mut [u8],
    from: &mut [u8],
) -> Result<Receipt> {
    let status = i32::try_from(status)
        .ok()
        .and_then(|status| ReceiveStatus::from_int(status).ok())
        .ok_or(Error::UnexpectedStatus(status))?;
    match status {
        ReceiveStatus::Empty if errno == Errno::EPERM => Ok(Receipt::Empty),
        ReceiveStatus::Empty => Err(Error::Receive(errno)),
        ReceiveStatus::Last | ReceiveStatus::More => {
            for buffer in [&mut *body, &mut *from] {
                if let Some(last) = buffer.last_mut() {
                    *last = 0;
                }
            }
            Ok(Receipt::Delivered {
                message: Message {
                    from: from_c_buffer(from),
                    body: from_c_buffer(body),
                },
                more: status == ReceiveStatus::More,
            })
        }
    }
}

/// An in-memory mailbox with first-in, first-out delivery per recipient.
#[derive(Default)]
pub struct MockMailbox {
    queues: HashMap<String, VecDeque<Message>>,
}

impl MockMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self, user: &str) -> usize {
        self.queues.get(user).map_or(0, VecDeque::len)
    }
}

impl Mailbox for MockMailbox {
    fn send(&mut self, to: &str, body: &str, from: &str) -> Result<()> {
        check_message(to, body, from)?;
        for (field, value) in [(Field::Recipient, to), (Field::Body, body), (Field::Sender, from)] {
            to_c_string(field, value)?;
        }
        self.queues
            .entry(to.to_owned())
            .or_default()
            .push_back(Message {
                from: from.to_owned(),
                body: body.to_owned(),
            });
        Ok(())
    }

    fn receive(&mut self, user: &str) -> Result<Receipt> {
        let Some(queue) = self.queues.get_mut(user) else {
            return Ok(Receipt::Empty);
        };
        match queue.pop_front() {
            None => Ok(Receipt::Empty),
            Some(message) => Ok(Receipt::Delivered {
                message,
                more: !queue.is_empty(),
            }),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Recipient => write!(f, "recipient"),
            Field::Sender => write!(f, "sender"),
            Field::Body => write!(f, "message"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooLong {
                field,
                length,
                limit,
            } => write!(
                f,
                "{} is {} bytes long, the limit is {} bytes",
                field, length, limit
            ),
            Error::InteriorNul(field) => write!(f, "{} contains a NUL byte", field),
            Error::Rejected(errno) => write!(f, "the kernel rejected the message: {}", errno),
            Error::Receive(errno) => write!(f, "cannot receive messages: {}", errno),
            Error::UnexpectedStatus(status) => {
                write!(f, "receive returned unexpected status {}", status)
            }
        }
    }
}

impl std::error::Error for Error {}
