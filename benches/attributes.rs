//! Attribute and window size benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nix::libc;
use nix::sys::termios::Termios;
use ptyconsole::attributes::{disable_echo, make_raw};
use ptyconsole::{new_pty, Console, WinSize};

fn cooked() -> Termios {
    // SAFETY: termios is plain old data; all-zero is a valid value
    let mut raw: libc::termios = unsafe { std::mem::zeroed() };
    raw.c_iflag = libc::ICRNL | libc::IXON;
    raw.c_oflag = libc::OPOST | libc::ONLCR;
    raw.c_cflag = libc::CS8 | libc::CREAD;
    raw.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN;
    Termios::from(raw)
}

fn bench_transformations(c: &mut Criterion) {
    let mut group = c.benchmark_group("attributes");
    let base = cooked();

    group.bench_function("make_raw", |b| {
        b.iter(|| {
            let mut attrs = base.clone();
            make_raw(&mut attrs);
            black_box(attrs)
        })
    });

    group.bench_function("disable_echo", |b| {
        b.iter(|| {
            let mut attrs = base.clone();
            disable_echo(&mut attrs);
            black_box(attrs)
        })
    });

    group.finish();
}

fn bench_live_console(c: &mut Criterion) {
    let mut group = c.benchmark_group("console");
    let (console, _slave) = new_pty().expect("Failed to allocate PTY");

    // Each call is a full tcgetattr + tcsetattr round trip
    group.bench_function("set_raw", |b| b.iter(|| console.set_raw().unwrap()));

    group.bench_function("resize_and_size", |b| {
        b.iter(|| {
            console.resize(WinSize::new(120, 40)).unwrap();
            black_box(console.size().unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_transformations, bench_live_console);

criterion_main!(benches);
