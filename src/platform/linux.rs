//! Linux pty primitives
//!
//! The slave is named by its numeric index under `/dev/pts`.
//!
//! Reference: https://man7.org/linux/man-pages/man4/pts.4.html

use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

use nix::libc;

pub(crate) const PTMX: &str = "/dev/ptmx";

const PTS_DIR: &str = "/dev/pts";

/// Resolve the slave path of a master via TIOCGPTN
pub(crate) fn ptsname(fd: BorrowedFd<'_>) -> nix::Result<PathBuf> {
    let mut index: libc::c_uint = 0;

    // SAFETY: TIOCGPTN writes the pty index into the pointed-to uint
    let result = unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCGPTN as _, &mut index) };
    if result < 0 {
        return Err(nix::Error::last());
    }

    Ok(Path::new(PTS_DIR).join(index.to_string()))
}

/// Unlock the slave via TIOCSPTLCK
pub(crate) fn unlockpt(fd: BorrowedFd<'_>) -> nix::Result<()> {
    let lock: libc::c_int = 0;

    // SAFETY: TIOCSPTLCK only reads the pointed-to int
    let result = unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCSPTLCK as _, &lock) };
    if result < 0 {
        return Err(nix::Error::last());
    }

    Ok(())
}

/// Path of an open descriptor as reported by procfs
pub(crate) fn device_name(fd: BorrowedFd<'_>) -> PathBuf {
    std::fs::read_link(format!("/proc/self/fd/{}", fd.as_raw_fd()))
        .unwrap_or_else(|_| PathBuf::from(PTMX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::os::fd::AsFd;
    use std::os::unix::fs::OpenOptionsExt;

    #[test]
    fn test_ptsname_is_numeric_index() {
        let master = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(PTMX)
            .unwrap();

        let slave = ptsname(master.as_fd()).unwrap();
        assert!(slave.starts_with(PTS_DIR));
        let index = slave.file_name().unwrap().to_str().unwrap();
        assert!(index.parse::<u32>().is_ok(), "unexpected slave name {:?}", slave);
    }

    #[test]
    fn test_unlock_then_open_slave() {
        let master = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(PTMX)
            .unwrap();

        let slave = ptsname(master.as_fd()).unwrap();
        let open_slave = || {
            OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_NOCTTY)
                .open(&slave)
        };

        // Slaves start out locked
        let err = open_slave().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EIO));

        unlockpt(master.as_fd()).unwrap();
        assert!(open_slave().is_ok());
    }

    #[test]
    fn test_ptsname_on_regular_file_fails() {
        let file = tempfile::tempfile().unwrap();
        assert_eq!(ptsname(file.as_fd()).unwrap_err(), nix::Error::ENOTTY);
    }

    #[test]
    fn test_device_name_of_temp_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let name = device_name(file.as_file().as_fd());
        assert_eq!(name.file_name(), file.path().file_name());
    }
}
