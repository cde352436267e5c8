#![no_main]

use arbitrary::Arbitrary;
use hlwire::{Account, DecoderOptions, Progress, RecordDecoder};
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    combine_surrogates: bool,
    small_arena: bool,
    split: u16,
    shape: Shape,
    raw: &'a [u8],
}

/// A record built from fields the decoder knows, so most inputs get past the
/// first few bytes.
#[derive(Debug, Arbitrary)]
struct Shape {
    id: Option<u32>,
    sex: Option<bool>,
    fname: Option<String>,
    email: Option<String>,
    birth: Option<i32>,
    interests: Vec<String>,
    likes: Vec<(u32, i32)>,
    premium: Option<(i32, i32)>,
    unknown: Option<String>,
}

impl Shape {
    fn to_json(&self) -> Vec<u8> {
        let mut obj = Map::new();
        if let Some(id) = self.id {
            obj.insert("id".into(), json!(id));
        }
        if let Some(male) = self.sex {
            obj.insert("sex".into(), json!(if male { "m" } else { "f" }));
        }
        if let Some(fname) = &self.fname {
            obj.insert("fname".into(), json!(fname));
        }
        if let Some(email) = &self.email {
            obj.insert("email".into(), json!(email));
        }
        if let Some(birth) = self.birth {
            obj.insert("birth".into(), json!(birth));
        }
        obj.insert("interests".into(), json!(self.interests));
        let likes = self.likes.iter().map(|&(id, ts)| json!({ "id": id, "ts": ts }));
        obj.insert("likes".into(), Value::Array(likes.collect()));
        if let Some((start, finish)) = self.premium {
            obj.insert("premium".into(), json!({ "start": start, "finish": finish }));
        }
        if let Some(unknown) = &self.unknown {
            obj.insert(format!("x-{unknown}"), json!([[{ "a": unknown }], null, 1.5e3]));
        }
        serde_json::to_vec(&Value::Object(obj)).expect("map serializes")
    }
}

/// A complete decode must report `Incomplete` for every shorter prefix.
fn check_prefixes(decoder: &RecordDecoder, bytes: &[u8], split: usize) {
    let mut account = Account::with_options(decoder.options());
    let Ok(Progress::Complete(consumed)) = decoder.decode(bytes, &mut account) else {
        return;
    };
    assert!(consumed <= bytes.len());
    let whole = account.clone();

    let cut = split % consumed.max(1);
    assert!(matches!(
        decoder.decode(&bytes[..cut], &mut account),
        Ok(Progress::Incomplete(n)) if n > 0
    ));

    // Decoding again after the short read lands on the same record.
    assert_eq!(decoder.decode(bytes, &mut account), Ok(Progress::Complete(consumed)));
    assert_eq!(account, whole);
}

fuzz_target!(|input: Input<'_>| {
    let options = DecoderOptions {
        combine_surrogates: input.combine_surrogates,
        arena_capacity: if input.small_arena { 64 } else { 1 << 16 },
        ..DecoderOptions::default()
    };
    let decoder = RecordDecoder::new(options);
    let split = usize::from(input.split);

    check_prefixes(&decoder, input.raw, split);

    let json = input.shape.to_json();
    check_prefixes(&decoder, &json, split);

    if !input.small_arena {
        let mut account = Account::with_options(&options);
        let res = decoder.decode(&json, &mut account);
        assert_eq!(res, Ok(Progress::Complete(json.len())));
        if let Some(id) = input.shape.id {
            assert_eq!(account.id, id);
        }
        assert_eq!(account.interests_count(), input.shape.interests.len());
        assert_eq!(account.likes().len(), input.shape.likes.len());
    }
});
