use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use webexchange::{
    param::{ConnectionDirective, Endpoint},
    request::Request,
    response::Response,
};

fn simple_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost:6969\r\nConnection: close\r\n\r\n";

    c.bench_function("simple_request_parse", |b| {
        b.iter(|| {
            let buffer = black_box(request.to_vec());
            let _ = Request::try_from(&buffer, 0).unwrap();
        });
    });
}

fn browser_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /path/to/resource.html HTTP/1.1\r\n\
                    Host: localhost:6969\r\n\
                    User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                    Accept: text/html,application/xhtml+xml\r\n\
                    Accept-Language: en-US,en;q=0.9\r\n\
                    Connection: keep-alive\r\n\
                    Upgrade-Insecure-Requests: 1\r\n\
                    \r\n";

    c.bench_function("browser_request_parse", |b| {
        b.iter(|| {
            let buffer = black_box(request.to_vec());
            let _ = Request::try_from(&buffer, 0).unwrap();
        });
    });
}

fn request_parse_different_path_lengths_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_path_length");

    let paths = [
        ("short", "/"),
        ("medium", "/path/to/resource"),
        ("long", "/very/long/path/to/some/resource/with/many/segments/and/a/file/name.html"),
    ];

    for (name, path) in paths.iter() {
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| {
                let buffer = black_box(request.as_bytes().to_vec());
                let _ = Request::try_from(&buffer, 0).unwrap();
            });
        });
    }

    group.finish();
}

fn request_build_benchmark(c: &mut Criterion) {
    let endpoint = Endpoint::new("127.0.0.1", 6969).unwrap();

    c.bench_function("request_build", |b| {
        b.iter(|| {
            let request = Request::get(black_box(&endpoint), black_box("index.html"));
            black_box(request.as_bytes());
        });
    });
}

fn response_serialize_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_serialize");

    for size in [64usize, 4 * 1024, 256 * 1024].iter() {
        let content = Bytes::from(vec![b'x'; *size]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &content, |b, content| {
            b.iter(|| {
                let response =
                    Response::response_200(content.clone(), ConnectionDirective::KeepAlive);
                black_box(response.as_bytes());
            });
        });
    }

    group.finish();
}

fn response_parse_benchmark(c: &mut Criterion) {
    let raw = Response::response_200(Bytes::from(vec![b'x'; 4096]), ConnectionDirective::Close)
        .as_bytes();

    c.bench_function("response_parse", |b| {
        b.iter(|| {
            let _ = Response::try_from(black_box(&raw)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    simple_request_parse_benchmark,
    browser_request_parse_benchmark,
    request_parse_different_path_lengths_benchmark,
    request_build_benchmark,
    response_serialize_benchmark,
    response_parse_benchmark
);
criterion_main!(benches);
