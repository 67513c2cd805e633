//! macOS pty primitives
//!
//! The slave is named by a direct query on the master rather than an index.

use std::ffi::CStr;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::PathBuf;

use nix::libc;

pub(crate) const PTMX: &str = "/dev/ptmx";

/// Size of the buffer TIOCPTYGNAME fills in
const PTY_NAME_LEN: usize = 128;

/// Resolve the slave path of a master via TIOCPTYGNAME
pub(crate) fn ptsname(fd: BorrowedFd<'_>) -> nix::Result<PathBuf> {
    let mut buf = [0 as libc::c_char; PTY_NAME_LEN];

    // SAFETY: TIOCPTYGNAME writes a NUL-terminated name of at most 128 bytes
    let result = unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCPTYGNAME as _, buf.as_mut_ptr()) };
    if result < 0 {
        return Err(nix::Error::last());
    }

    // SAFETY: the kernel NUL-terminates the name within the buffer
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(PathBuf::from(name.to_string_lossy().into_owned()))
}

/// Grant and unlock the slave via TIOCPTYGRANT and TIOCPTYUNLK
pub(crate) fn unlockpt(fd: BorrowedFd<'_>) -> nix::Result<()> {
    // SAFETY: both ioctls take no argument
    unsafe {
        if libc::ioctl(fd.as_raw_fd(), libc::TIOCPTYGRANT as _) < 0 {
            return Err(nix::Error::last());
        }
        if libc::ioctl(fd.as_raw_fd(), libc::TIOCPTYUNLK as _) < 0 {
            return Err(nix::Error::last());
        }
    }

    Ok(())
}

/// Path of an open descriptor via F_GETPATH
pub(crate) fn device_name(fd: BorrowedFd<'_>) -> PathBuf {
    let mut buf = [0 as libc::c_char; libc::PATH_MAX as usize];

    // SAFETY: F_GETPATH writes a NUL-terminated path of at most PATH_MAX bytes
    let result = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETPATH, buf.as_mut_ptr()) };
    if result < 0 {
        return PathBuf::from(PTMX);
    }

    // SAFETY: the kernel NUL-terminates the path within the buffer
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    PathBuf::from(name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::os::fd::AsFd;
    use std::os::unix::fs::OpenOptionsExt;

    fn open_master() -> std::fs::File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(PTMX)
            .unwrap()
    }

    #[test]
    fn test_ptsname_is_tty_device() {
        let master = open_master();
        let slave = ptsname(master.as_fd()).unwrap();
        assert!(
            slave.to_string_lossy().starts_with("/dev/ttys"),
            "unexpected slave name {:?}",
            slave
        );
    }

    #[test]
    fn test_unlock_then_open_slave() {
        let master = open_master();
        let slave = ptsname(master.as_fd()).unwrap();
        unlockpt(master.as_fd()).unwrap();

        assert!(OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&slave)
            .is_ok());
    }

    #[test]
    fn test_ptsname_on_regular_file_fails() {
        let file = tempfile::tempfile().unwrap();
        assert_eq!(ptsname(file.as_fd()).unwrap_err(), nix::Error::ENOTTY);
    }

    #[test]
    fn test_device_name_of_master() {
        let master = open_master();
        let name = device_name(master.as_fd());
        assert!(name.starts_with("/dev"), "unexpected master name {:?}", name);
    }
}
