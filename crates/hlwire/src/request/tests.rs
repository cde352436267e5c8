use alloc::{format, vec::Vec};

use rstest::rstest;

use super::*;
use crate::{ArenaError, Progress, RequestError};

fn decode(src: &str) -> (Request, Result<Progress, RequestError>) {
    let mut req = Request::new();
    let res = RequestDecoder::new().decode(src.as_bytes(), &mut req);
    (req, res)
}

fn decode_ok(src: &str) -> Request {
    let (req, res) = decode(src);
    assert_eq!(res, Ok(Progress::Complete(src.len())), "decoding {src:?}");
    req
}

fn get(target: &str) -> Request {
    decode_ok(&format!("GET {target} HTTP/1.1\r\nHost: x\r\n\r\n"))
}

#[test]
fn suggest_with_limit_and_country() {
    let src = "GET /accounts/5/suggest/?limit=10&country=USA HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
    let req = decode_ok(src);
    assert_eq!(req.kind, RequestKind::Suggest);
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.entity_id, Some(5));
    assert_eq!(req.content_length, 0);

    let basic = req.basic().unwrap();
    assert_eq!(basic.present, BasicFlags::LIMIT | BasicFlags::COUNTRY);
    assert_eq!(basic.limit, 10);
    assert_eq!(req.text(basic.country), Some("USA"));
    assert!(req.filter().is_none());
}

#[test]
fn filter_parameters_set_their_bits() {
    let req = get(concat!(
        "/accounts/filter/?sex_eq=f&email_domain=mail.ru&status_neq=%D0%B7%D0%B0%D0%BD%D1%8F%D1%82%D1%8B",
        "&fname_any=%D0%90%D0%BD%D0%BD%D0%B0,Ivan&sname_null=0&phone_code=965&country_null=1",
        "&city_eq=Paris&birth_lt=-100&birth_year=1990&interests_contains=IT,Music",
        "&likes_contains=1,22,333&premium_now=1&limit=50&query_id=7"
    ));
    assert_eq!(req.kind, RequestKind::Filter);
    assert_eq!(req.entity_id, None);
    assert_eq!(req.query_id, Some(7));

    let f = req.filter().unwrap();
    assert_eq!(
        f.present,
        FilterFlags::SEX_EQ
            | FilterFlags::EMAIL_DOMAIN
            | FilterFlags::STATUS_NEQ
            | FilterFlags::FNAME_ANY
            | FilterFlags::SNAME_NULL
            | FilterFlags::PHONE_CODE
            | FilterFlags::COUNTRY_NULL
            | FilterFlags::CITY_EQ
            | FilterFlags::BIRTH_LT
            | FilterFlags::BIRTH_YEAR
            | FilterFlags::INTERESTS_CONTAINS
            | FilterFlags::LIKES_CONTAINS
            | FilterFlags::PREMIUM_NOW
            | FilterFlags::LIMIT
    );
    assert_eq!(req.mask(), f.present.bits());
    assert_eq!(f.sex, Sex::Female);
    assert_eq!(req.text(f.email_domain), Some("mail.ru"));
    assert_eq!(f.status, Status::Occupied);
    assert!(!f.sname_null);
    assert_eq!(f.phone_code, 965);
    assert!(f.country_null);
    assert_eq!(req.text(f.city), Some("Paris"));
    assert_eq!(f.birth_lt, -100);
    assert_eq!(f.birth_year, 1990);
    assert!(f.premium_now);
    assert_eq!(f.limit, 50);

    let names: Vec<&[u8]> = req.split_list(f.fname_any).collect();
    assert_eq!(names, ["Анна".as_bytes(), &b"Ivan"[..]]);
    let likes: Vec<&[u8]> = req.split_list(f.likes_contains).collect();
    assert_eq!(likes, [&b"1"[..], &b"22"[..], &b"333"[..]]);
    assert_eq!(req.split_list(f.interests_any).count(), 0);
}

#[test]
fn group_parameters() {
    let req = get("/accounts/group/?keys=country,status&order=1&limit=5&joined=2015&interests=Music");
    assert_eq!(req.kind, RequestKind::Group);
    let b = req.basic().unwrap();
    assert_eq!(
        b.present,
        BasicFlags::KEYS
            | BasicFlags::ORDER
            | BasicFlags::LIMIT
            | BasicFlags::JOINED
            | BasicFlags::INTERESTS
    );
    assert_eq!(b.keys.as_slice(), [GroupKey::Country, GroupKey::Status]);
    assert_eq!(b.order, Order::Desc);
    assert_eq!(b.joined, 2015);
    assert_eq!(req.text(b.interests), Some("Music"));
}

#[test]
fn recommend_with_plus_and_percent() {
    let req = get("/accounts/123/recommend/?city=New+York%2C%20NY&limit=3");
    assert_eq!(req.kind, RequestKind::Recommend);
    assert_eq!(req.entity_id, Some(123));
    let b = req.basic().unwrap();
    assert_eq!(req.text(b.city), Some("New York, NY"));
}

#[test]
fn unknown_parameters_are_skipped() {
    let req = get("/accounts/filter/?foo=bar&sex_eq=m&utm=%zz&limit=1");
    assert_eq!(req.kind, RequestKind::Filter);
    let f = req.filter().unwrap();
    assert_eq!(f.present, FilterFlags::SEX_EQ | FilterFlags::LIMIT);
    // Skipped values never reach the arena.
    assert_eq!(req.arena().cursor(), 0);
}

#[test]
fn post_endpoints_and_body() {
    let body = r#"{"id":1}"#;
    let src = format!(
        "POST /accounts/new/?query_id=3 HTTP/1.1\r\ncontent-LENGTH: {}\r\n\r\n{body}",
        body.len()
    );
    let mut req = Request::new();
    let res = RequestDecoder::new().decode(src.as_bytes(), &mut req);
    let Ok(Progress::Complete(consumed)) = res else {
        panic!("unexpected {res:?}");
    };
    assert_eq!(consumed, src.len() - body.len());
    assert_eq!(req.kind, RequestKind::AccountsNew);
    assert!(req.kind.has_body());
    assert_eq!(req.params, Params::None);
    assert_eq!(req.query_id, Some(3));
    assert_eq!(req.content_length, body.len());
    assert_eq!(req.body(src.as_bytes(), consumed), Some(body.as_bytes()));
    assert_eq!(req.body(&src.as_bytes()[..src.len() - 1], consumed), None);

    let req = decode_ok("POST /accounts/42/ HTTP/1.1\r\n\r\n");
    assert_eq!(req.kind, RequestKind::AccountsUpdate);
    assert_eq!(req.entity_id, Some(42));

    let req = decode_ok("POST /accounts/likes/ HTTP/1.0\r\nContent-Length:  17 \r\n\r\n");
    assert_eq!(req.kind, RequestKind::AccountsLikes);
    assert_eq!(req.content_length, 17);
}

#[rstest]
#[case::get_new("GET /accounts/new/ HTTP/1.1")]
#[case::post_filter("POST /accounts/filter/ HTTP/1.1")]
#[case::put("PUT /accounts/1/ HTTP/1.1")]
#[case::unknown_endpoint("GET /accounts/search/ HTTP/1.1")]
#[case::id_on_filter("GET /accounts/1/filter/ HTTP/1.1")]
#[case::no_version("GET /accounts/filter/")]
#[case::bad_version("GET /accounts/filter/ FTP/1.0")]
#[case::bad_limit("GET /accounts/filter/?limit=ten HTTP/1.1")]
#[case::zero_limit("GET /accounts/group/?limit=0 HTTP/1.1")]
#[case::bad_sex("GET /accounts/filter/?sex_eq=x HTTP/1.1")]
#[case::bad_status("GET /accounts/group/?status=free HTTP/1.1")]
#[case::bad_key("GET /accounts/group/?keys=birth HTTP/1.1")]
#[case::duplicate_key("GET /accounts/group/?keys=sex,sex HTTP/1.1")]
#[case::bad_order("GET /accounts/group/?order=-1 HTTP/1.1")]
#[case::bad_null("GET /accounts/filter/?fname_null=yes HTTP/1.1")]
#[case::empty_value("GET /accounts/filter/?city_eq=&limit=1 HTTP/1.1")]
#[case::cut_escape("GET /accounts/filter/?city_eq=a%2 HTTP/1.1")]
#[case::big_phone("GET /accounts/filter/?phone_code=70000 HTTP/1.1")]
#[case::bad_query_id("GET /accounts/filter/?query_id=-1 HTTP/1.1")]
fn classified_invalid(#[case] line: &str) {
    let req = decode_ok(&format!("{line}\r\nContent-Length: 0\r\n\r\n"));
    assert_eq!(req.kind, RequestKind::Invalid);
    assert_eq!(req.params, Params::None);
    assert_eq!(req.mask(), 0);
}

#[test]
fn header_lines_without_colon_are_skipped() {
    let req = decode_ok("GET /accounts/filter/?limit=2 HTTP/1.1\r\nfoo\r\nHost x\r\n\r\n");
    assert_eq!(req.kind, RequestKind::Filter);
    assert_eq!(req.content_length, 0);

    let req = decode_ok("POST /accounts/7/ HTTP/1.1\r\nfoo\r\nContent-Length:\t3\t\r\n\r\n");
    assert_eq!(req.kind, RequestKind::AccountsUpdate);
    assert_eq!(req.content_length, 3);
}

#[test]
fn header_errors() {
    let (_, res) = decode("GET /accounts/filter/ HTTP/1.1\r\nfoo\r\nContent-Length: x\r\n\r\n");
    assert_eq!(res, Err(RequestError::InvalidContentLength { offset: 52 }));

    let (_, res) = decode("GET /accounts/filter/ HTTP/1.1\r\nHost: x\r\nContent-Length: -1\r\n\r\n");
    assert_eq!(res, Err(RequestError::InvalidContentLength { offset: 56 }));
}

#[test]
fn arena_capacity_is_enforced() {
    let options = DecoderOptions {
        arena_capacity: 4,
        ..DecoderOptions::default()
    };
    let mut req = Request::with_options(&options);
    let res = RequestDecoder::new().decode(
        b"GET /accounts/filter/?city_eq=Moscow HTTP/1.1\r\n\r\n",
        &mut req,
    );
    assert_eq!(
        res,
        Err(RequestError::Arena(ArenaError::CapacityExceeded {
            requested: 5,
            capacity: 4
        }))
    );
}

#[test]
fn request_id_survives_decoding() {
    let mut req = Request::new();
    req.request_id = 99;
    let res = RequestDecoder::new().decode(b"GET /accounts/group/ HTTP/1.1\r\n\r\n", &mut req);
    assert_eq!(res, Ok(Progress::Complete(33)));
    assert_eq!(req.request_id, 99);
    assert_eq!(req.kind, RequestKind::Group);
}

#[test]
fn reused_request_is_reset() {
    let mut req = Request::new();
    let mut decoder = RequestDecoder::new();
    let first = b"GET /accounts/filter/?country_eq=Spain&limit=1 HTTP/1.1\r\n\r\n";
    assert!(decoder.decode(first, &mut req).unwrap().is_complete());
    let second = b"POST /accounts/7/?query_id=1 HTTP/1.1\r\n\r\n";
    assert!(decoder.decode(second, &mut req).unwrap().is_complete());
    assert_eq!(req.kind, RequestKind::AccountsUpdate);
    assert_eq!(req.params, Params::None);
    assert_eq!(req.arena().cursor(), 0);
}

#[test]
fn every_prefix_is_incomplete() {
    let src: &[u8] = b"GET /accounts/filter/?sex_eq=m&city_any=A,B%20C&limit=20 HTTP/1.1\r\nHost: h\r\nContent-Length: 0\r\n\r\n";
    let whole = {
        let mut req = Request::new();
        assert_eq!(
            RequestDecoder::new().decode(src, &mut req),
            Ok(Progress::Complete(src.len()))
        );
        req
    };

    // Fresh decoder per prefix.
    for cut in 0..src.len() {
        let mut req = Request::new();
        let res = RequestDecoder::new().decode(&src[..cut], &mut req);
        assert!(
            matches!(res, Ok(Progress::Incomplete(n)) if n >= 1 && cut + n <= src.len()),
            "cut at {cut}: {res:?}"
        );
    }

    // One decoder fed a growing buffer.
    let mut decoder = RequestDecoder::new();
    let mut req = Request::new();
    for cut in 0..src.len() {
        assert!(matches!(decoder.decode(&src[..cut], &mut req), Ok(Progress::Incomplete(_))));
    }
    assert_eq!(
        decoder.decode(src, &mut req),
        Ok(Progress::Complete(src.len()))
    );
    assert_eq!(req, whole);
}

#[test]
fn group_keys_compare_by_listed_keys() {
    let mut a = GroupKeys::new();
    assert!(a.push(GroupKey::City));
    a.clear();
    assert!(a.push(GroupKey::Sex));
    let mut b = GroupKeys::new();
    assert!(b.push(GroupKey::Sex));
    assert_eq!(a, b);
    assert!(!b.push(GroupKey::Sex));
    assert_eq!(b.len(), 1);
}
