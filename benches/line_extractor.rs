use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use edgeserve::parser::scan_line;

const SHORT: &[u8] = b"GET /index.html HTTP/1.1\r\n";
const MEDIUM: &[u8] = b"User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/109.0\r\n";
const LONG: &[u8] = b"Cookie: 1P_JAR=2023-01-24-14; AEC=xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx; NID=xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx; OGPC=xxxxxxxxxxx\r\n";

fn benchmark(c: &mut Criterion) {
    let inputs = [SHORT, MEDIUM, LONG];

    let mut group = c.benchmark_group("scan_line");
    for &input in inputs.iter() {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("scan", input.len() as u64), input, |b, i| {
            b.iter(|| black_box(scan_line(i)))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
