//! Criterion benchmarks for the CoAP codec.
//!
//! Every bridged HTTP request encodes one request and decodes one or two
//! datagrams, so the codec must stay far below the 3 s device timeout even on
//! small hosts.  These benchmarks keep an eye on that.
//!
//! Run with:
//! ```bash
//! cargo bench --package coap-core --bench codec_bench
//! ```

use coap_core::protocol::messages::content_format;
use coap_core::{decode_message, encode_message, Code, CoapMessage, MessageType};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_get() -> CoapMessage {
    let mut msg = CoapMessage::confirmable_request(Code::GET, 0x1234, &[1, 2, 3, 4]);
    msg.set_uri_path("/led");
    msg
}

fn make_put() -> CoapMessage {
    let mut msg =
        CoapMessage::confirmable_request(Code::PUT, 0x1235, &[1, 2, 3, 4]).with_payload("off");
    msg.set_uri_path("/led");
    msg
}

fn make_json_response() -> CoapMessage {
    let mut msg = CoapMessage::new(MessageType::Acknowledgement, Code::CONTENT, 0x1234);
    msg.token = vec![1, 2, 3, 4];
    msg.set_content_format(content_format::JSON);
    msg.with_payload(r#"{"state":"on","uptime_ms":123456}"#)
}

fn make_empty_ack() -> CoapMessage {
    CoapMessage::empty_ack(0x1234)
}

fn fixtures() -> Vec<(&'static str, CoapMessage)> {
    vec![
        ("get", make_get()),
        ("put", make_put()),
        ("json_response", make_json_response()),
        ("empty_ack", make_empty_ack()),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, msg) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &msg, |b, m| {
            b.iter(|| encode_message(black_box(m)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, msg) in fixtures() {
        let bytes = encode_message(&msg).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
