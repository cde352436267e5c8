use alloc::{format, string::String, vec::Vec};

use quickcheck::QuickCheck;

use super::{arbitrary::JsonBody, iterations};
use crate::{ByteArena, JsonString, UrlDecode, decode_json_string, decode_url_value};

/// Property: decoding a JSON string body yields the same bytes as
/// `serde_json`, and consumes exactly the body and its closing quote.
#[test]
fn json_string_matches_serde_json() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(body: JsonBody) -> bool {
        let encoded = body.encode();
        let expected: String = serde_json::from_str(&format!("\"{encoded}\"")).unwrap();

        let input = format!("{encoded}\"tail");
        let mut arena = ByteArena::with_capacity(1 << 16);
        let mut pos = 0;
        match decode_json_string(input.as_bytes(), &mut pos, &mut arena, true) {
            Ok(JsonString::Complete(r)) => {
                arena.view(r) == expected.as_bytes() && pos == encoded.len() + 1
            }
            _ => false,
        }
    }

    QuickCheck::new()
        .tests(iterations())
        .quickcheck(prop as fn(JsonBody) -> bool);
}

/// Property: a string body cut anywhere before its closing quote is
/// incomplete, and leaves both the position and the arena untouched.
#[test]
fn truncated_json_string_is_incomplete() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(body: JsonBody) -> bool {
        let encoded = body.encode();
        let mut arena = ByteArena::with_capacity(1 << 16);
        (0..=encoded.len()).all(|cut| {
            let mut pos = 0;
            let res = decode_json_string(&encoded.as_bytes()[..cut], &mut pos, &mut arena, true);
            matches!(res, Ok(JsonString::Incomplete(n)) if n > 0) && pos == 0 && arena.cursor() == 0
        })
    }

    QuickCheck::new()
        .tests(iterations() / 10)
        .quickcheck(prop as fn(JsonBody) -> bool);
}

/// Property: percent-encoding arbitrary bytes and decoding them again is
/// the identity, and the decoder stops at the first `&`.
#[test]
fn url_value_decodes_percent_encoding() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(bytes: Vec<u8>, spaces_as_plus: bool) -> bool {
        let mut encoded = String::new();
        for &b in &bytes {
            match b {
                b' ' if spaces_as_plus => encoded.push('+'),
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' | b'_' => {
                    encoded.push(char::from(b));
                }
                _ => encoded.push_str(&format!("%{b:02X}")),
            }
        }
        encoded.push_str("&next=1");

        let mut arena = ByteArena::with_capacity(1 << 16);
        let mut pos = 0;
        let start = arena.cursor();
        match decode_url_value(encoded.as_bytes(), &mut pos, &mut arena) {
            Ok(UrlDecode::Complete(n)) => {
                n == bytes.len()
                    && arena.as_bytes()[start as usize..] == bytes[..]
                    && encoded.as_bytes()[pos] == b'&'
            }
            _ => false,
        }
    }

    QuickCheck::new()
        .tests(iterations())
        .quickcheck(prop as fn(Vec<u8>, bool) -> bool);
}
