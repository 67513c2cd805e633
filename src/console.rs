//! Console master handle
//!
//! A [`Master`] owns the master end of a pseudoterminal pair together with
//! the terminal attributes captured when it was wrapped. Attribute changes
//! are always read-modify-write of the live state; only [`Console::reset`]
//! goes back to the captured snapshot.
//!
//! Nothing here spawns threads or retries: every OS failure is returned
//! to the caller as an [`Error`].

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::libc;
use nix::sys::termios::Termios;

use crate::attributes::{self, tcget, tcset};
use crate::error::{Error, Result};
use crate::platform;
use crate::size::{tcgwinsz, tcswinsz, WinSize};

/// A terminal-backed byte stream whose attributes and size can be managed.
///
/// [`Master`] is the only implementation in this crate.
pub trait Console: Read + Write {
    /// Set the window size
    fn resize(&self, size: WinSize) -> Result<()>;

    /// Copy the window size of `other` onto this console.
    ///
    /// Nothing is applied if reading `other`'s size fails.
    fn resize_from(&self, other: &dyn Console) -> Result<()>;

    /// Restore the attributes captured at construction. Succeeds without
    /// doing anything when no snapshot was captured.
    fn reset(&self) -> Result<()>;

    /// Put the console in raw mode, starting from its current attributes
    fn set_raw(&self) -> Result<()>;

    /// Turn off local echo, starting from its current attributes
    fn disable_echo(&self) -> Result<()>;

    /// Get the window size
    fn size(&self) -> Result<WinSize>;

    /// Raw descriptor, for polling or passing to other OS APIs
    fn fd(&self) -> Result<RawFd>;

    /// Path the OS reports for the underlying device
    fn name(&self) -> Result<&Path>;

    /// Close the descriptor. Every later call fails with [`Error::Closed`].
    fn close(&mut self) -> Result<()>;
}

/// The master end of a pseudoterminal pair
#[derive(Debug)]
pub struct Master {
    file: Option<File>,
    name: PathBuf,
    /// Attributes at construction; never written after capture
    original: Option<libc::termios>,
}

/// Allocate a new pty pair.
///
/// Returns the master as a console and the path of the slave, which the
/// caller opens separately (see [`open_slave`]).
pub fn new_pty() -> Result<(Master, PathBuf)> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(platform::PTMX)
        .map_err(|source| Error::OpenMaster {
            path: PathBuf::from(platform::PTMX),
            source,
        })?;

    new_pty_from_file(file)
}

/// Like [`new_pty`], but use an already open master instead of opening the
/// cloning device.
///
/// Ownership of `file` moves into the returned [`Master`]. On error the file
/// is dropped, which closes it.
pub fn new_pty_from_file(file: File) -> Result<(Master, PathBuf)> {
    let slave = platform::ptsname(file.as_fd()).map_err(Error::SlaveName)?;
    platform::unlockpt(file.as_fd()).map_err(Error::Unlock)?;

    let master = Master::wrap(file);
    tracing::debug!(
        "Allocated PTY master {} with slave {}",
        master.name.display(),
        slave.display()
    );

    Ok((master, slave))
}

/// Open the slave end of a pty for reading and writing.
///
/// The slave is opened with `O_NOCTTY` so it does not become the caller's
/// controlling terminal.
pub fn open_slave<P: AsRef<Path>>(path: P) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)?;
    Ok(file)
}

/// The console attached to this process's stdio.
///
/// stdin, stdout and stderr are tried in that order. The first one that is
/// a terminal is duplicated so the returned [`Master`] owns its own
/// descriptor and closing it leaves stdio alone.
pub fn current() -> Result<Master> {
    let (stdin, stdout, stderr) = (io::stdin(), io::stdout(), io::stderr());
    let candidates: [BorrowedFd<'_>; 3] = [stdin.as_fd(), stdout.as_fd(), stderr.as_fd()];

    for fd in candidates {
        if is_console(fd) {
            let owned = fd.try_clone_to_owned()?;
            return Ok(Master::wrap(File::from(owned)));
        }
    }

    Err(Error::NotAConsole)
}

/// Check whether a descriptor is backed by a terminal.
///
/// Only reads attributes; never changes them.
pub fn is_console<Fd: AsFd>(fd: Fd) -> bool {
    tcget(fd).is_ok()
}

/// Like [`is_console`], reporting [`Error::NotAConsole`] instead of `false`
pub fn check_console<Fd: AsFd>(fd: Fd) -> Result<()> {
    if is_console(fd) {
        Ok(())
    } else {
        Err(Error::NotAConsole)
    }
}

impl Master {
    /// Wrap an open terminal file that is not necessarily a pty master.
    ///
    /// No slave is resolved and nothing is unlocked.
    pub fn from_file(file: File) -> Result<Self> {
        check_console(&file)?;
        Ok(Self::wrap(file))
    }

    /// Take ownership of `file` and capture its current attributes
    fn wrap(file: File) -> Self {
        let name = platform::device_name(file.as_fd());
        let original = match tcget(&file) {
            Ok(attrs) => Some(libc::termios::from(attrs)),
            Err(e) => {
                tracing::debug!("No attribute snapshot for {}: {}", name.display(), e);
                None
            },
        };

        Self {
            file: Some(file),
            name,
            original,
        }
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::Closed)
    }

    fn current_attributes(&self) -> Result<Termios> {
        tcget(self.file()?)
    }
}

impl Console for Master {
    fn resize(&self, size: WinSize) -> Result<()> {
        tcswinsz(self.file()?.as_fd(), size)
    }

    fn resize_from(&self, other: &dyn Console) -> Result<()> {
        let size = other.size()?;
        self.resize(size)
    }

    fn reset(&self) -> Result<()> {
        let file = self.file()?;
        match self.original {
            Some(original) => tcset(file, &Termios::from(original)),
            None => Ok(()),
        }
    }

    fn set_raw(&self) -> Result<()> {
        let mut attrs = self.current_attributes()?;
        attributes::make_raw(&mut attrs);
        tcset(self.file()?, &attrs)
    }

    fn disable_echo(&self) -> Result<()> {
        let mut attrs = self.current_attributes()?;
        attributes::disable_echo(&mut attrs);
        tcset(self.file()?, &attrs)
    }

    fn size(&self) -> Result<WinSize> {
        tcgwinsz(self.file()?.as_fd())
    }

    fn fd(&self) -> Result<RawFd> {
        Ok(self.file()?.as_raw_fd())
    }

    fn name(&self) -> Result<&Path> {
        self.file()?;
        Ok(&self.name)
    }

    fn close(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(Error::Closed)?;
        tracing::trace!("Closing console {}", self.name.display());
        nix::unistd::close(file.into_raw_fd()).map_err(Error::Close)
    }
}

impl Read for Master {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl Read for &Master {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file()?;
        file.read(buf)
    }
}

impl Write for Master {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

impl Write for &Master {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file()?;
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file()?;
        file.flush()
    }
}
