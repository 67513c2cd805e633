//! ptyconsole relay - run a program on a fresh pty and relay stdio to it
//!
//! Allocates a pty pair, starts a program on the slave, puts the outer
//! terminal in raw mode and copies bytes both ways. Window size changes of
//! the outer terminal (SIGWINCH) are forwarded to the inner pty.

use std::io::{self, Read, Write};
use std::os::fd::BorrowedFd;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitCode, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use ptyconsole::config::RelayConfig;
use ptyconsole::{clear_onlcr, current, new_pty, open_slave, Console, Master, WinSize};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static RESIZED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigwinch(_: libc::c_int) {
    RESIZED.store(true, Ordering::Relaxed);
}

struct Options {
    config: RelayConfig,
    show_help: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut config_path: Option<PathBuf> = None;
    let mut cols: Option<u16> = None;
    let mut rows: Option<u16> = None;
    let mut shell: Option<String> = None;
    let mut no_raw = false;
    let mut no_echo = false;
    let mut no_onlcr = false;
    let mut show_help = false;
    let mut rest: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--cols" => {
                i += 1;
                let value = args.get(i).ok_or("--cols needs a value")?;
                cols = Some(value.parse().map_err(|_| format!("invalid column count: {}", value))?);
            },
            "-r" | "--rows" => {
                i += 1;
                let value = args.get(i).ok_or("--rows needs a value")?;
                rows = Some(value.parse().map_err(|_| format!("invalid row count: {}", value))?);
            },
            "-s" | "--shell" => {
                i += 1;
                shell = Some(args.get(i).ok_or("--shell needs a value")?.clone());
            },
            "--config" => {
                i += 1;
                config_path = Some(PathBuf::from(args.get(i).ok_or("--config needs a value")?));
            },
            "--no-raw" => no_raw = true,
            "--no-echo" => no_echo = true,
            "--no-onlcr" => no_onlcr = true,
            "-h" | "--help" => show_help = true,
            "--" => {
                rest.extend(args[i + 1..].iter().cloned());
                break;
            },
            other => return Err(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => RelayConfig::load(&path)
            .map_err(|e| format!("failed to load {}: {}", path.display(), e))?,
        None => RelayConfig::load_or_default(),
    };

    if shell.is_some() {
        config.shell = shell;
    }
    if !rest.is_empty() {
        config.args = rest;
    }
    if cols.is_some() || rows.is_some() {
        let base = config.size.unwrap_or(WinSize::new(80, 24));
        config.size = Some(WinSize::new(cols.unwrap_or(base.width), rows.unwrap_or(base.height)));
    }
    config.raw &= !no_raw;
    config.echo &= !no_echo;
    config.onlcr &= !no_onlcr;

    Ok(Options { config, show_help })
}

fn spawn_child(config: &RelayConfig, slave_path: &Path) -> io::Result<Child> {
    let slave = open_slave(slave_path)?;

    let mut command = Command::new(config.resolved_shell());
    command
        .args(&config.args)
        .env("TERM", std::env::var("TERM").unwrap_or_else(|_| "xterm-256color".to_string()))
        .stdin(Stdio::from(slave.try_clone()?))
        .stdout(Stdio::from(slave.try_clone()?))
        .stderr(Stdio::from(slave));

    // SAFETY: only async-signal-safe calls between fork and exec
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map_err(io::Error::from)?;
            if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    command.spawn()
}

/// A configured size wins over the outer terminal; 80x24 when neither exists
fn apply_initial_size(
    pty: &Master,
    outer: Option<&Master>,
    size: Option<WinSize>,
) -> ptyconsole::Result<()> {
    match (outer, size) {
        (_, Some(size)) => pty.resize(size),
        (Some(outer), None) => pty.resize_from(outer),
        (None, None) => pty.resize(WinSize::new(80, 24)),
    }
}

fn install_sigwinch() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigwinch),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only stores to an atomic
    unsafe { signal::sigaction(Signal::SIGWINCH, &action) }?;
    Ok(())
}

fn relay(pty: &Master, outer: Option<&Master>) -> io::Result<()> {
    let mut stdout = io::stdout();
    let mut buf = [0u8; 4096];
    let fd = pty.fd()?;

    loop {
        if RESIZED.swap(false, Ordering::Relaxed) {
            if let Some(outer) = outer {
                match pty.resize_from(outer) {
                    Ok(()) => tracing::debug!("Forwarded size {:?}", pty.size().ok()),
                    Err(e) => tracing::warn!("Failed to forward window size: {}", e),
                }
            }
        }

        // SAFETY: the master fd stays open for the whole loop
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(100u16)) {
            Ok(0) => continue,
            Ok(_) => {},
            Err(nix::Error::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }

        match (&*pty).read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => {
                stdout.write_all(&buf[..n])?;
                stdout.flush()?;
            },
            // EIO once every slave descriptor is closed
            Err(e) if e.raw_os_error() == Some(libc::EIO) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            print_help();
            return ExitCode::FAILURE;
        },
    };

    if options.show_help {
        print_help();
        return ExitCode::SUCCESS;
    }
    let config = options.config;

    let (pty, slave_path) = match new_pty() {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to allocate PTY: {}", e);
            return ExitCode::FAILURE;
        },
    };
    let pty = Arc::new(pty);
    tracing::info!("Allocated PTY, slave {}", slave_path.display());

    let outer = match current() {
        Ok(outer) => Some(outer),
        Err(e) => {
            tracing::info!("No outer terminal: {}", e);
            None
        },
    };

    if let Err(e) = apply_initial_size(&pty, outer.as_ref(), config.size) {
        tracing::warn!("Failed to set initial window size: {}", e);
    }

    if !config.echo {
        if let Err(e) = pty.disable_echo() {
            tracing::warn!("Failed to disable echo: {}", e);
        }
    }
    if !config.onlcr {
        if let Ok(fd) = pty.fd() {
            // SAFETY: pty owns fd and outlives this call
            let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
            if let Err(e) = clear_onlcr(borrowed) {
                tracing::warn!("Failed to clear ONLCR: {}", e);
            }
        }
    }

    let mut child = match spawn_child(&config, &slave_path) {
        Ok(child) => child,
        Err(e) => {
            eprintln!("Failed to spawn {}: {}", config.resolved_shell(), e);
            return ExitCode::FAILURE;
        },
    };
    tracing::info!("Spawned {}, child PID: {}", config.resolved_shell(), child.id());

    if let Err(e) = install_sigwinch() {
        tracing::warn!("Failed to install SIGWINCH handler: {}", e);
    }

    if let Some(outer) = outer.as_ref().filter(|_| config.raw) {
        if let Err(e) = outer.set_raw() {
            tracing::warn!("Failed to put terminal in raw mode: {}", e);
        }
    }

    // Copy stdin to the pty; this thread is left blocked in read at exit
    let input = Arc::clone(&pty);
    thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buf = [0u8; 1024];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if (&*input).write_all(&buf[..n]).is_err() {
                        break;
                    }
                },
                Err(_) => break,
            }
        }
    });

    let relayed = relay(&pty, outer.as_ref());

    if let Some(outer) = &outer {
        if let Err(e) = outer.reset() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }

    if let Err(e) = relayed {
        tracing::error!("Relay error: {}", e);
    }

    match child.wait() {
        Ok(status) => {
            tracing::info!("Child exited with {}", status);
            match (status.code(), status.signal()) {
                (Some(0), _) => ExitCode::SUCCESS,
                (Some(code), _) => ExitCode::from(code as u8),
                (None, Some(sig)) => ExitCode::from(128u8.wrapping_add(sig as u8)),
                (None, None) => ExitCode::FAILURE,
            }
        },
        Err(e) => {
            tracing::error!("Wait error: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn print_help() {
    println!("ptyconsole relay - run a program on a new pty");
    println!();
    println!("Usage: ptyconsole-relay [OPTIONS] [-- ARGS...]");
    println!();
    println!("Options:");
    println!("  -c, --cols <N>       Initial width (default: outer terminal, else 80)");
    println!("  -r, --rows <N>       Initial height (default: outer terminal, else 24)");
    println!("  -s, --shell <PATH>   Program to run (default: $SHELL or /bin/sh)");
    println!("      --config <PATH>  Config file (default: ~/.config/ptyconsole/relay.json)");
    println!("      --no-raw         Leave the outer terminal in cooked mode");
    println!("      --no-echo        Disable echo on the inner pty");
    println!("      --no-onlcr       Clear ONLCR on the inner pty");
    println!("  -h, --help           Show this help message");
    println!();
    println!("Arguments after -- are passed to the program.");
}
