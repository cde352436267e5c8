//! Benchmark – record, request and account-file decoding
#![allow(missing_docs)]

use std::{hint::black_box, time::Duration};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hlwire::{Account, AccountStream, DecoderOptions, Progress, RecordDecoder, Request, RequestDecoder};

const RECORD: &str = r#"{"id":1308,"email":"ertedrueta@list.ru","fname":"Алексей","sname":"Стамашевич","phone":"8(927)4502734","sex":"m","birth":630435429,"country":"Росляндия","city":"Амстеросок","joined":1330387200,"status":"заняты","interests":["Пиво","Автомобили","Фитнес","Компьютеры"],"premium":{"start":1531148458,"finish":1538924458},"likes":[{"ts":1510468766,"id":14941},{"ts":1503542005,"id":8119},{"ts":1476470364,"id":26223}]}"#;

const REQUESTS: &[(&str, &str)] = &[
    (
        "filter",
        "GET /accounts/filter/?sex_eq=f&status_neq=%D0%B7%D0%B0%D0%BD%D1%8F%D1%82%D1%8B&interests_any=%D0%9F%D0%B8%D0%B2%D0%BE,%D0%A4%D0%B8%D1%82%D0%BD%D0%B5%D1%81&limit=20&query_id=1 HTTP/1.1\r\nHost: 127.0.0.1\r\nUser-Agent: bench\r\nAccept: */*\r\n\r\n",
    ),
    (
        "group",
        "GET /accounts/group/?keys=country,status&birth=1990&order=1&limit=10&query_id=2 HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n",
    ),
    (
        "update",
        "POST /accounts/1308/?query_id=3 HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Type: application/json\r\nContent-Length: 41\r\n\r\n",
    ),
];

/// An account file holding `n` copies of the sample record with distinct ids.
fn make_account_file(n: usize) -> String {
    let mut s = String::from("{\"accounts\": [");
    for i in 0..n {
        if i > 0 {
            s.push_str(",\n");
        }
        let record = RECORD.replacen("\"id\":1308", &format!("\"id\":{}", i + 1), 1);
        s.push_str(&record);
    }
    s.push_str("]}");
    s
}

fn bench_record(c: &mut Criterion) {
    let decoder = RecordDecoder::new(DecoderOptions::default());
    let mut account = Account::new();

    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Bytes(RECORD.len() as u64));
    group.bench_function("whole", |b| {
        b.iter(|| {
            let progress = decoder.decode(black_box(RECORD.as_bytes()), &mut account).unwrap();
            black_box(progress);
        });
    });
    // Every prefix is tried before the whole record, as a reader on a slow
    // socket would.
    group.bench_function("byte_by_byte", |b| {
        let bytes = RECORD.as_bytes();
        b.iter(|| {
            for end in 1..=bytes.len() {
                if let Progress::Complete(n) = decoder.decode(&bytes[..end], &mut account).unwrap() {
                    black_box(n);
                }
            }
        });
    });
    group.finish();
}

fn bench_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("request");
    for &(name, src) in REQUESTS {
        let mut decoder = RequestDecoder::new();
        let mut request = Request::new();
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, src| {
            b.iter(|| {
                let progress = decoder.decode(black_box(src.as_bytes()), &mut request).unwrap();
                black_box((progress, request.mask()));
            });
        });
    }
    group.finish();
}

fn bench_account_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("account_file");
    for &n in &[100usize, 10_000] {
        let data = make_account_file(n);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            let mut account = Account::new();
            b.iter(|| {
                let mut stream = AccountStream::new(black_box(data.as_bytes()), DecoderOptions::default());
                let mut likes = 0usize;
                stream.for_each_account(&mut account, |a| likes += a.likes().len());
                assert_eq!(stream.decoded(), n);
                black_box(likes);
            });
        });
    }
    group.finish();
}

fn criterion() -> Criterion {
    let mut c = Criterion::default();
    if cfg!(feature = "bench-fast") {
        c = c
            .warm_up_time(Duration::from_millis(10))
            .measurement_time(Duration::from_millis(100))
            .sample_size(10);
    } else {
        c = c
            .warm_up_time(Duration::from_secs(3))
            .measurement_time(Duration::from_secs(5));
    }
    c
}

criterion_group! { name = benches; config = criterion(); targets = bench_record, bench_request, bench_account_file }
criterion_main!(benches);
