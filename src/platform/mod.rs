//! Per-target pty primitives
//!
//! Each target module provides the same small surface, selected at build
//! time:
//! - `PTMX`: the pty cloning device
//! - `ptsname`: resolve the slave device path of an open master
//! - `unlockpt`: unlock the slave so it can be opened
//! - `device_name`: the path the kernel reports for an open descriptor

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) use linux::{device_name, ptsname, unlockpt, PTMX};

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub(crate) use macos::{device_name, ptsname, unlockpt, PTMX};

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos")))]
compile_error!("ptyconsole supports Linux and macOS pseudoterminals only");
