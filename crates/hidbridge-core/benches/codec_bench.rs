//! Criterion benchmarks for the hidbridge line codec.
//!
//! `MOUSE` dominates the wire (one line per movement event), so the encode
//! and decode paths for it are what matter; the handshake messages are
//! measured once for reference.
//!
//! Run with:
//! ```bash
//! cargo bench --package hidbridge-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hidbridge_core::protocol::codec::{decode_line, encode_line};
use hidbridge_core::protocol::messages::{HelloMessage, Message, MoveEvent, PresetRef};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_mouse() -> Message {
    Message::Mouse(MoveEvent {
        dx: 5,
        dy: -3,
        buttons: 1,
    })
}

fn make_hello() -> Message {
    Message::Hello(HelloMessage {
        version: "1.0.0".to_string(),
        secret: "benchmark-secret".to_string(),
        preset: PresetRef {
            name: "p1".to_string(),
            sha256: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".to_string(),
        },
    })
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mouse = make_mouse();
    let hello = make_hello();

    c.bench_function("encode_mouse_line", |b| {
        b.iter(|| encode_line(black_box(&mouse)).unwrap())
    });
    c.bench_function("encode_hello_line", |b| {
        b.iter(|| encode_line(black_box(&hello)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let mouse_line = encode_line(&make_mouse()).unwrap();
    let hello_line = encode_line(&make_hello()).unwrap();

    c.bench_function("decode_mouse_line", |b| {
        b.iter(|| decode_line(black_box(&mouse_line)).unwrap())
    });
    c.bench_function("decode_hello_line", |b| {
        b.iter(|| decode_line(black_box(&hello_line)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
