//! Terminal attribute (termios) handling
//!
//! The attribute block is treated as an opaque snapshot that is read with
//! `tcgetattr` and written back with `tcsetattr`. Only the transformations
//! below look inside it:
//! - raw mode: canonical processing, echo and signals off, output
//!   post-processing kept on
//! - echo off: clears `ECHO` and nothing else
//! - ONLCR on/off: newline to CR-NL translation on output
//!
//! Reference: https://man7.org/linux/man-pages/man3/termios.3.html

use std::os::fd::AsFd;

use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
    Termios,
};

use crate::error::{Error, Result};

/// Read the current attributes of a terminal descriptor
pub(crate) fn tcget<Fd: AsFd>(fd: Fd) -> Result<Termios> {
    termios::tcgetattr(fd).map_err(Error::Termios)
}

/// Commit attributes immediately (TCSANOW)
pub(crate) fn tcset<Fd: AsFd>(fd: Fd, attrs: &Termios) -> Result<()> {
    termios::tcsetattr(fd, SetArg::TCSANOW, attrs).map_err(Error::Termios)
}

/// Apply the raw-mode transformation in place.
///
/// Same as `cfmakeraw(3)` except that `OPOST` stays set, so output written
/// through the pty is still post-processed.
pub fn make_raw(attrs: &mut Termios) {
    attrs.input_flags &= !(InputFlags::IGNBRK
        | InputFlags::BRKINT
        | InputFlags::PARMRK
        | InputFlags::ISTRIP
        | InputFlags::INLCR
        | InputFlags::IGNCR
        | InputFlags::ICRNL
        | InputFlags::IXON);
    attrs.local_flags &= !(LocalFlags::ECHO
        | LocalFlags::ECHONL
        | LocalFlags::ICANON
        | LocalFlags::ISIG
        | LocalFlags::IEXTEN);
    attrs.control_flags &= !(ControlFlags::CSIZE | ControlFlags::PARENB);
    attrs.control_flags |= ControlFlags::CS8;
    attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    attrs.output_flags |= OutputFlags::OPOST;
}

/// Clear the local echo flag, leaving every other flag untouched
pub fn disable_echo(attrs: &mut Termios) {
    attrs.local_flags.remove(LocalFlags::ECHO);
}

/// Set or clear ONLCR, leaving every other flag untouched
pub fn set_onlcr_flag(attrs: &mut Termios, enable: bool) {
    attrs.output_flags.set(OutputFlags::ONLCR, enable);
}

/// Clear ONLCR on a terminal so that a pty pair we created relays bytes
/// unchanged.
///
/// Linux unix98 ptys come up with ONLCR set. That is what a terminal
/// emulator wants, but a relay passing data through from another terminal
/// would then translate every newline twice.
pub fn clear_onlcr<Fd: AsFd>(fd: Fd) -> Result<()> {
    update_onlcr(fd, false)
}

/// Set ONLCR on a terminal, the mode a terminal emulator expects.
pub fn set_onlcr<Fd: AsFd>(fd: Fd) -> Result<()> {
    update_onlcr(fd, true)
}

fn update_onlcr<Fd: AsFd>(fd: Fd, enable: bool) -> Result<()> {
    let fd = fd.as_fd();
    let mut attrs = tcget(fd)?;
    set_onlcr_flag(&mut attrs, enable);
    tcset(fd, &attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::libc;

    fn cooked() -> Termios {
        // SAFETY: termios is plain old data; all-zero is a valid value
        let mut raw: libc::termios = unsafe { std::mem::zeroed() };
        raw.c_iflag = libc::ICRNL | libc::IXON | libc::BRKINT;
        raw.c_oflag = libc::OPOST | libc::ONLCR;
        raw.c_cflag = libc::CS7 | libc::PARENB | libc::CREAD;
        raw.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN | libc::ECHOE;
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 5;
        Termios::from(raw)
    }

    #[test]
    fn test_make_raw_disables_line_discipline() {
        let mut attrs = cooked();
        make_raw(&mut attrs);

        assert!(!attrs.local_flags.contains(LocalFlags::ECHO));
        assert!(!attrs.local_flags.contains(LocalFlags::ICANON));
        assert!(!attrs.local_flags.contains(LocalFlags::ISIG));
        assert!(!attrs.local_flags.contains(LocalFlags::IEXTEN));
        assert!(!attrs.input_flags.contains(InputFlags::ICRNL));
        assert!(!attrs.input_flags.contains(InputFlags::IXON));
        assert!(!attrs.control_flags.contains(ControlFlags::PARENB));
        assert_eq!(attrs.control_flags & ControlFlags::CSIZE, ControlFlags::CS8);
        assert_eq!(attrs.control_chars[SpecialCharacterIndices::VMIN as usize], 1);
        assert_eq!(attrs.control_chars[SpecialCharacterIndices::VTIME as usize], 0);
    }

    #[test]
    fn test_make_raw_keeps_output_processing() {
        let mut attrs = cooked();
        attrs.output_flags.remove(OutputFlags::OPOST);
        make_raw(&mut attrs);
        assert!(attrs.output_flags.contains(OutputFlags::OPOST));
        // cfmakeraw would not touch ONLCR either
        assert!(attrs.output_flags.contains(OutputFlags::ONLCR));
        // unrelated control flags survive
        assert!(attrs.control_flags.contains(ControlFlags::CREAD));
    }

    #[test]
    fn test_make_raw_is_idempotent() {
        let mut once = cooked();
        make_raw(&mut once);
        let mut twice = once.clone();
        make_raw(&mut twice);

        assert_eq!(once.input_flags, twice.input_flags);
        assert_eq!(once.output_flags, twice.output_flags);
        assert_eq!(once.control_flags, twice.control_flags);
        assert_eq!(once.local_flags, twice.local_flags);
        assert_eq!(once.control_chars, twice.control_chars);
    }

    #[test]
    fn test_disable_echo_only_touches_echo() {
        let before = cooked();
        let mut after = before.clone();
        disable_echo(&mut after);

        assert!(!after.local_flags.contains(LocalFlags::ECHO));
        assert_eq!(after.local_flags | LocalFlags::ECHO, before.local_flags);
        assert_eq!(after.input_flags, before.input_flags);
        assert_eq!(after.output_flags, before.output_flags);
        assert_eq!(after.control_flags, before.control_flags);
        assert_eq!(after.control_chars, before.control_chars);
    }

    #[test]
    fn test_set_onlcr_flag() {
        let mut attrs = cooked();
        set_onlcr_flag(&mut attrs, false);
        assert!(!attrs.output_flags.contains(OutputFlags::ONLCR));
        assert!(attrs.output_flags.contains(OutputFlags::OPOST));
        set_onlcr_flag(&mut attrs, true);
        assert!(attrs.output_flags.contains(OutputFlags::ONLCR));
    }

    #[test]
    fn test_tcget_on_regular_file_fails() {
        let file = tempfile::tempfile().unwrap();
        assert!(matches!(tcget(&file), Err(Error::Termios(_))));
        assert!(clear_onlcr(&file).is_err());
    }
}
