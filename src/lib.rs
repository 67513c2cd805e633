//! ptyconsole - pseudoterminal master handle
//!
//! This crate allocates a pty master/slave pair and manages the master end
//! on behalf of a program driving another program's terminal:
//!
//! - `console`: the [`Console`] trait, the [`Master`] handle and the pty
//!   constructors
//! - `attributes`: termios transformations (raw mode, echo, ONLCR)
//! - `size`: window size get/set
//! - `config`: settings for the `ptyconsole-relay` binary
//!
//! Linux and macOS are supported; the slave naming and unlock primitives
//! are picked per target at build time.
//!
//! Reference: https://man7.org/linux/man-pages/man7/pty.7.html

pub mod attributes;
pub mod config;
pub mod console;
mod error;
mod platform;
pub mod size;

pub use attributes::{clear_onlcr, set_onlcr};
pub use console::{
    check_console, current, is_console, new_pty, new_pty_from_file, open_slave, Console, Master,
};
pub use error::{Error, Result};
pub use size::WinSize;
