//! Benchmarks for the hot paths of a caller scan:
//! - Call signature parsing
//! - Constant pool parsing
//! - Call-site decoding of a method body

extern crate jarscope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use jarscope::{bytecode::decode_calls, classfile::ConstantPool, CallSignature, Parser};
use std::hint::black_box;

/// Constant pool with one method reference at index 6: `java/io/File.delete()Z`.
fn pool_bytes() -> Vec<u8> {
    let mut data = 7u16.to_be_bytes().to_vec();
    for (tag, body) in [
        (1u8, utf8("java/io/File")),
        (7, 1u16.to_be_bytes().to_vec()),
        (1, utf8("delete")),
        (1, utf8("()Z")),
        (12, [3u16.to_be_bytes(), 4u16.to_be_bytes()].concat()),
        (10, [2u16.to_be_bytes(), 5u16.to_be_bytes()].concat()),
    ] {
        data.push(tag);
        data.extend_from_slice(&body);
    }
    data
}

fn utf8(value: &str) -> Vec<u8> {
    let mut body = (value.len() as u16).to_be_bytes().to_vec();
    body.extend_from_slice(value.as_bytes());
    body
}

/// Benchmark parsing a fully specified signature.
fn bench_signature_parse(c: &mut Criterion) {
    let value = "java.io.File#renameTo#(Ljava/io/File;)Z#1";

    c.bench_function("signature_parse", |b| {
        b.iter(|| {
            let signature = CallSignature::parse(black_box(value)).unwrap();
            black_box(signature)
        });
    });
}

/// Benchmark parsing and printing a wildcard signature.
fn bench_signature_wildcard_roundtrip(c: &mut Criterion) {
    let value = "org.example.util.FileUtil#delete#null#9";

    c.bench_function("signature_wildcard_display", |b| {
        b.iter(|| {
            let signature = CallSignature::parse(black_box(value)).unwrap();
            black_box(signature.to_string())
        });
    });
}

fn bench_constant_pool(c: &mut Criterion) {
    let data = pool_bytes();

    c.bench_function("constant_pool_parse", |b| {
        b.iter(|| {
            let pool = ConstantPool::parse(&mut Parser::new(black_box(&data))).unwrap();
            black_box(pool)
        });
    });
}

/// Benchmark decoding a body of 1000 `aload_0; invokevirtual; pop` sequences.
fn bench_decode_calls(c: &mut Criterion) {
    let data = pool_bytes();
    let pool = ConstantPool::parse(&mut Parser::new(&data)).unwrap();

    let mut code = Vec::new();
    for _ in 0..1000 {
        code.extend_from_slice(&[0x2a, 0xb6, 0x00, 0x06, 0x57]);
    }
    code.push(0xb1);

    let mut group = c.benchmark_group("decode_calls");
    group.throughput(Throughput::Bytes(code.len() as u64));
    group.bench_function("invokevirtual_x1000", |b| {
        b.iter(|| {
            let calls = decode_calls(black_box(&code), &pool).unwrap();
            black_box(calls)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_signature_parse,
    bench_signature_wildcard_roundtrip,
    bench_constant_pool,
    bench_decode_calls
);
criterion_main!(benches);
