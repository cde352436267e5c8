//! Typed decoding of query-string values, one table per parameter set.

use bstr::ByteSlice;

use super::{BasicFlags, BasicParams, FilterFlags, FilterParams, GroupKey, GroupKeys, Order};
use crate::{
    account::{Sex, Status},
    arena::{ByteArena, StringRef},
    error::ArenaError,
    escape::{UrlDecode, decode_url_value},
};

/// Why a recognized parameter was not accepted.
#[derive(Debug)]
pub(super) enum Reject {
    /// The value does not parse as the parameter's type.
    Value,
    Arena(ArenaError),
}

impl From<ArenaError> for Reject {
    fn from(err: ArenaError) -> Self {
        Reject::Arena(err)
    }
}

type Accept<T> = Result<T, Reject>;

/// Splits a query string into `(key, raw value)` pairs. A pair without `=`
/// has an empty value; empty pairs are dropped.
pub(super) fn pairs(query: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    query
        .split_str(b"&")
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once_str(b"=").unwrap_or((pair, &b""[..])))
}

/// Parses a plain decimal `u32`. No sign, no surrounding whitespace.
pub(super) fn parse_u32(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
    })
}

fn parse_i32(value: &[u8]) -> Option<i32> {
    match value.split_first() {
        Some((b'-', digits)) => {
            let magnitude = i64::from(parse_u32(digits)?);
            i32::try_from(-magnitude).ok()
        }
        _ => i32::try_from(parse_u32(value)?).ok(),
    }
}

fn uint(value: &[u8]) -> Accept<u32> {
    parse_u32(value).ok_or(Reject::Value)
}

fn int(value: &[u8]) -> Accept<i32> {
    parse_i32(value).ok_or(Reject::Value)
}

fn limit(value: &[u8]) -> Accept<u32> {
    match parse_u32(value) {
        Some(n) if n > 0 => Ok(n),
        _ => Err(Reject::Value),
    }
}

fn flag(value: &[u8]) -> Accept<bool> {
    match value {
        b"0" => Ok(false),
        b"1" => Ok(true),
        _ => Err(Reject::Value),
    }
}

fn sex(value: &[u8]) -> Accept<Sex> {
    Sex::from_code(value).ok_or(Reject::Value)
}

fn order(value: &[u8]) -> Accept<Order> {
    match value {
        b"0" => Ok(Order::Asc),
        b"1" => Ok(Order::Desc),
        _ => Err(Reject::Value),
    }
}

/// Percent-decodes a non-empty value into the arena.
fn string(value: &[u8], arena: &mut ByteArena) -> Accept<StringRef> {
    if value.is_empty() {
        return Err(Reject::Value);
    }
    let start = arena.cursor();
    let mut pos = 0;
    match decode_url_value(value, &mut pos, arena)? {
        UrlDecode::Exhausted(_) => Ok(arena.finish(start)),
        // An embedded NUL or a cut-off `%` escape.
        UrlDecode::Complete(_) | UrlDecode::NeedMoreInput(_) => {
            arena.truncate(start);
            Err(Reject::Value)
        }
    }
}

/// Decodes a value only long enough to inspect it.
fn scratch<T>(
    value: &[u8],
    arena: &mut ByteArena,
    inspect: impl FnOnce(&[u8]) -> Option<T>,
) -> Accept<T> {
    let r = string(value, arena)?;
    let parsed = inspect(arena.view(r));
    arena.truncate(r.offset());
    parsed.ok_or(Reject::Value)
}

fn status(value: &[u8], arena: &mut ByteArena) -> Accept<Status> {
    scratch(value, arena, Status::from_literal)
}

fn group_keys(value: &[u8], arena: &mut ByteArena) -> Accept<GroupKeys> {
    scratch(value, arena, |list| {
        let mut keys = GroupKeys::new();
        for name in list.split_str(b",") {
            if !keys.push(GroupKey::from_name(name)?) {
                return None;
            }
        }
        Some(keys)
    })
}

/// Applies one filter parameter. Returns `Ok(false)` for an unknown key.
pub(super) fn filter(
    params: &mut FilterParams,
    key: &[u8],
    value: &[u8],
    arena: &mut ByteArena,
) -> Accept<bool> {
    let set = match key {
        b"sex_eq" => {
            params.sex = sex(value)?;
            FilterFlags::SEX_EQ
        }
        b"email_domain" => {
            params.email_domain = string(value, arena)?;
            FilterFlags::EMAIL_DOMAIN
        }
        b"email_lt" => {
            params.email_lt = string(value, arena)?;
            FilterFlags::EMAIL_LT
        }
        b"email_gt" => {
            params.email_gt = string(value, arena)?;
            FilterFlags::EMAIL_GT
        }
        b"status_eq" => {
            params.status = status(value, arena)?;
            FilterFlags::STATUS_EQ
        }
        b"status_neq" => {
            params.status = status(value, arena)?;
            FilterFlags::STATUS_NEQ
        }
        b"fname_eq" => {
            params.fname = string(value, arena)?;
            FilterFlags::FNAME_EQ
        }
        b"fname_any" => {
            params.fname_any = string(value, arena)?;
            FilterFlags::FNAME_ANY
        }
        b"fname_null" => {
            params.fname_null = flag(value)?;
            FilterFlags::FNAME_NULL
        }
        b"sname_eq" => {
            params.sname = string(value, arena)?;
            FilterFlags::SNAME_EQ
        }
        b"sname_starts" => {
            params.sname_starts = string(value, arena)?;
            FilterFlags::SNAME_STARTS
        }
        b"sname_null" => {
            params.sname_null = flag(value)?;
            FilterFlags::SNAME_NULL
        }
        b"phone_code" => {
            params.phone_code = u16::try_from(uint(value)?).map_err(|_| Reject::Value)?;
            FilterFlags::PHONE_CODE
        }
        b"phone_null" => {
            params.phone_null = flag(value)?;
            FilterFlags::PHONE_NULL
        }
        b"country_eq" => {
            params.country = string(value, arena)?;
            FilterFlags::COUNTRY_EQ
        }
        b"country_null" => {
            params.country_null = flag(value)?;
            FilterFlags::COUNTRY_NULL
        }
        b"city_eq" => {
            params.city = string(value, arena)?;
            FilterFlags::CITY_EQ
        }
        b"city_any" => {
            params.city_any = string(value, arena)?;
            FilterFlags::CITY_ANY
        }
        b"city_null" => {
            params.city_null = flag(value)?;
            FilterFlags::CITY_NULL
        }
        b"birth_lt" => {
            params.birth_lt = int(value)?;
            FilterFlags::BIRTH_LT
        }
        b"birth_gt" => {
            params.birth_gt = int(value)?;
            FilterFlags::BIRTH_GT
        }
        b"birth_year" => {
            params.birth_year = int(value)?;
            FilterFlags::BIRTH_YEAR
        }
        b"interests_contains" => {
            params.interests_contains = string(value, arena)?;
            FilterFlags::INTERESTS_CONTAINS
        }
        b"interests_any" => {
            params.interests_any = string(value, arena)?;
            FilterFlags::INTERESTS_ANY
        }
        b"likes_contains" => {
            params.likes_contains = string(value, arena)?;
            FilterFlags::LIKES_CONTAINS
        }
        b"premium_now" => {
            params.premium_now = flag(value)?;
            FilterFlags::PREMIUM_NOW
        }
        b"premium_null" => {
            params.premium_null = flag(value)?;
            FilterFlags::PREMIUM_NULL
        }
        b"limit" => {
            params.limit = limit(value)?;
            FilterFlags::LIMIT
        }
        _ => return Ok(false),
    };
    params.present |= set;
    Ok(true)
}

/// Applies one group/recommend/suggest parameter. Returns `Ok(false)` for
/// an unknown key.
pub(super) fn basic(
    params: &mut BasicParams,
    key: &[u8],
    value: &[u8],
    arena: &mut ByteArena,
) -> Accept<bool> {
    let set = match key {
        b"keys" => {
            params.keys = group_keys(value, arena)?;
            BasicFlags::KEYS
        }
        b"sex" => {
            params.sex = sex(value)?;
            BasicFlags::SEX
        }
        b"status" => {
            params.status = status(value, arena)?;
            BasicFlags::STATUS
        }
        b"country" => {
            params.country = string(value, arena)?;
            BasicFlags::COUNTRY
        }
        b"city" => {
            params.city = string(value, arena)?;
            BasicFlags::CITY
        }
        b"interests" => {
            params.interests = string(value, arena)?;
            BasicFlags::INTERESTS
        }
        b"birth" => {
            params.birth = int(value)?;
            BasicFlags::BIRTH
        }
        b"joined" => {
            params.joined = int(value)?;
            BasicFlags::JOINED
        }
        b"likes" => {
            params.likes = uint(value)?;
            BasicFlags::LIKES
        }
        b"order" => {
            params.order = order(value)?;
            BasicFlags::ORDER
        }
        b"limit" => {
            params.limit = limit(value)?;
            BasicFlags::LIMIT
        }
        _ => return Ok(false),
    };
    params.present |= set;
    Ok(true)
}
