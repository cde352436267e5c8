#![no_main]

use arbitrary::Arbitrary;
use hlwire::{Progress, Request, RequestDecoder};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    /// Chunk sizes used to grow the buffer; zero entries are skipped.
    chunks: Vec<u8>,
    endpoint: u8,
    query: &'a [u8],
    headers: Vec<(&'a str, &'a str)>,
}

const ENDPOINTS: &[&str] = &[
    "GET /accounts/filter/",
    "GET /accounts/group/",
    "GET /accounts/1/recommend/",
    "GET /accounts/2/suggest/",
    "POST /accounts/new/",
    "POST /accounts/3/",
    "POST /accounts/likes/",
];

impl Input<'_> {
    fn head(&self) -> Vec<u8> {
        let endpoint = ENDPOINTS[usize::from(self.endpoint) % ENDPOINTS.len()];
        let mut head = endpoint.as_bytes().to_vec();
        head.push(b'?');
        head.extend(self.query.iter().filter(|&&b| !matches!(b, b' ' | b'\r' | b'\n')));
        head.extend_from_slice(b" HTTP/1.1\r\n");
        for (name, value) in &self.headers {
            head.extend(name.bytes().filter(|&b| b != b'\r' && b != b'\n'));
            head.extend_from_slice(b": ");
            head.extend(value.bytes().filter(|&b| b != b'\r' && b != b'\n'));
            head.extend_from_slice(b"\r\n");
        }
        head.extend_from_slice(b"\r\n");
        head
    }
}

fuzz_target!(|input: Input<'_>| {
    let head = input.head();

    let mut whole = Request::new();
    let expected = RequestDecoder::new().decode(&head, &mut whole);

    let mut decoder = RequestDecoder::new();
    let mut request = Request::new();
    let mut end = 0;
    for &chunk in input.chunks.iter().filter(|&&c| c > 0) {
        end = (end + usize::from(chunk)).min(head.len());
        if end == head.len() {
            break;
        }
        // The blank line is only at the very end, so every shorter buffer is
        // a partial head.
        match decoder.decode(&head[..end], &mut request) {
            Ok(Progress::Incomplete(n)) => assert!(n > 0 && end + n <= head.len()),
            other => panic!("prefix of {end} bytes decoded as {other:?}"),
        }
    }

    let res = decoder.decode(&head, &mut request);
    assert_eq!(res, expected);
    if let Ok(Progress::Complete(consumed)) = res {
        assert_eq!(consumed, head.len());
        assert_eq!(request, whole);
    }
});
