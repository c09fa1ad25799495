//! Direct framebuffer drawing for Linux consoles, and a client for the kernel
//! message queue.

pub mod color;
pub mod config;
pub mod dumper;
pub mod font;
pub mod framebuffer;
pub mod graphics;
pub mod logging;
pub mod mailbox;
pub mod square;
pub mod surface;
pub mod terminal;

pub use color::Color;
pub use graphics::Graphics;
pub use surface::{Geometry, LayoutError, Surface};

pub const fn static_assert(condition: bool) {
    assert!(condition);
}
