//! Window size for a console

use std::os::fd::{AsRawFd, BorrowedFd};

use nix::libc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Terminal geometry in character cells.
///
/// Zero in either field means "unknown". The value is passed to the kernel
/// as-is; any range check is left to the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinSize {
    /// Number of rows
    pub height: u16,
    /// Number of columns
    pub width: u16,
}

impl WinSize {
    /// Create a new window size
    pub fn new(width: u16, height: u16) -> Self {
        Self { height, width }
    }

    /// Convert to libc winsize structure. Pixel fields are left zero.
    pub fn to_winsize(&self) -> libc::winsize {
        libc::winsize {
            ws_row: self.height,
            ws_col: self.width,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }
}

impl From<libc::winsize> for WinSize {
    fn from(ws: libc::winsize) -> Self {
        Self {
            height: ws.ws_row,
            width: ws.ws_col,
        }
    }
}

/// Get the window size of a terminal descriptor (TIOCGWINSZ)
pub(crate) fn tcgwinsz(fd: BorrowedFd<'_>) -> Result<WinSize> {
    let mut ws = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ writes a winsize into the pointed-to struct
    let result = unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCGWINSZ as _, &mut ws) };

    if result < 0 {
        Err(Error::WindowSize(nix::Error::last()))
    } else {
        Ok(WinSize::from(ws))
    }
}

/// Set the window size of a terminal descriptor (TIOCSWINSZ)
pub(crate) fn tcswinsz(fd: BorrowedFd<'_>, size: WinSize) -> Result<()> {
    let ws = size.to_winsize();

    // SAFETY: TIOCSWINSZ only reads the pointed-to struct
    let result = unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCSWINSZ as _, &ws) };

    if result < 0 {
        Err(Error::WindowSize(nix::Error::last()))
    } else {
        Ok(())
    }
}
