//! The request descriptor and its decoder.
//!
//! A [`Request`] describes one HTTP request head: which endpoint it targets,
//! the numeric id in its path, and the typed query parameters. Each settable
//! parameter has a bit in a presence mask ([`FilterFlags`] or
//! [`BasicFlags`]); a parameter field is meaningful only while its bit is
//! set. String parameters are percent-decoded into the request's own
//! [`ByteArena`].

mod decoder;
mod query;

#[cfg(test)]
mod tests;

use bitflags::bitflags;
use bstr::ByteSlice;

pub use decoder::RequestDecoder;

use crate::{
    Timestamp,
    account::{Sex, Status},
    arena::{ByteArena, StringRef},
    options::DecoderOptions,
};

/// Endpoint a request was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestKind {
    /// The request line could not be classified, or a recognized parameter
    /// carried a malformed value. The caller should answer `400`.
    #[default]
    Invalid,
    /// `GET /accounts/filter/`
    Filter,
    /// `GET /accounts/group/`
    Group,
    /// `GET /accounts/{id}/recommend/`
    Recommend,
    /// `GET /accounts/{id}/suggest/`
    Suggest,
    /// `POST /accounts/new/`
    AccountsNew,
    /// `POST /accounts/{id}/`
    AccountsUpdate,
    /// `POST /accounts/likes/`
    AccountsLikes,
}

impl RequestKind {
    /// The method this endpoint must be called with.
    pub fn expected_method(self) -> Option<Method> {
        match self {
            RequestKind::Invalid => None,
            RequestKind::Filter
            | RequestKind::Group
            | RequestKind::Recommend
            | RequestKind::Suggest => Some(Method::Get),
            RequestKind::AccountsNew | RequestKind::AccountsUpdate | RequestKind::AccountsLikes => {
                Some(Method::Post)
            }
        }
    }

    /// Whether a request body is expected.
    pub fn has_body(self) -> bool {
        self.expected_method() == Some(Method::Post)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Unknown,
    Get,
    Post,
}

impl Method {
    pub fn from_token(token: &[u8]) -> Method {
        match token {
            b"GET" => Method::Get,
            b"POST" => Method::Post,
            _ => Method::Unknown,
        }
    }
}

bitflags! {
    /// Presence mask of the `/accounts/filter/` parameters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FilterFlags: u32 {
        const SEX_EQ = 1 << 0;

        const EMAIL_DOMAIN = 1 << 1;
        const EMAIL_LT = 1 << 2;
        const EMAIL_GT = 1 << 3;

        const STATUS_EQ = 1 << 4;
        const STATUS_NEQ = 1 << 5;

        const FNAME_EQ = 1 << 6;
        const FNAME_ANY = 1 << 7;
        const FNAME_NULL = 1 << 8;

        const SNAME_EQ = 1 << 9;
        const SNAME_STARTS = 1 << 10;
        const SNAME_NULL = 1 << 11;

        const PHONE_CODE = 1 << 12;
        const PHONE_NULL = 1 << 13;

        const COUNTRY_EQ = 1 << 14;
        const COUNTRY_NULL = 1 << 15;

        const CITY_EQ = 1 << 16;
        const CITY_ANY = 1 << 17;
        const CITY_NULL = 1 << 18;

        const BIRTH_LT = 1 << 19;
        const BIRTH_GT = 1 << 20;
        const BIRTH_YEAR = 1 << 21;

        const INTERESTS_CONTAINS = 1 << 22;
        const INTERESTS_ANY = 1 << 23;

        const LIKES_CONTAINS = 1 << 24;

        const PREMIUM_NOW = 1 << 25;
        const PREMIUM_NULL = 1 << 26;

        const LIMIT = 1 << 27;
    }
}

/// Parameters of a filter request.
///
/// `*_null` fields hold the requested nullness: `true` selects accounts
/// without the field, `false` accounts with it. List-valued parameters
/// (`fname_any`, `city_any`, `interests_*`, `likes_contains`) keep the raw
/// comma-separated value; see [`Request::split_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterParams {
    pub present: FilterFlags,

    pub sex: Sex,
    pub email_domain: StringRef,
    pub email_lt: StringRef,
    pub email_gt: StringRef,
    pub status: Status,
    pub fname: StringRef,
    pub fname_any: StringRef,
    pub fname_null: bool,
    pub sname: StringRef,
    pub sname_starts: StringRef,
    pub sname_null: bool,
    pub phone_code: u16,
    pub phone_null: bool,
    pub country: StringRef,
    pub country_null: bool,
    pub city: StringRef,
    pub city_any: StringRef,
    pub city_null: bool,
    pub birth_lt: Timestamp,
    pub birth_gt: Timestamp,
    pub birth_year: i32,
    pub interests_contains: StringRef,
    pub interests_any: StringRef,
    pub likes_contains: StringRef,
    pub premium_now: bool,
    pub premium_null: bool,
    pub limit: u32,
}

impl FilterParams {
    #[inline]
    pub fn has(&self, flags: FilterFlags) -> bool {
        self.present.contains(flags)
    }
}

bitflags! {
    /// Presence mask of the group, recommend and suggest parameters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BasicFlags: u32 {
        const SEX = 1 << 0;
        const STATUS = 1 << 1;
        const COUNTRY = 1 << 2;
        const CITY = 1 << 3;
        const BIRTH = 1 << 4;
        const INTERESTS = 1 << 5;
        const LIKES = 1 << 6;
        const JOINED = 1 << 7;

        const KEYS = 1 << 8;
        const ORDER = 1 << 9;
        const LIMIT = 1 << 10;
    }
}

/// A field accounts can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum GroupKey {
    Sex = 0,
    Status,
    Country,
    City,
    Interests,
}

impl GroupKey {
    pub fn from_name(name: &[u8]) -> Option<GroupKey> {
        match name {
            b"sex" => Some(GroupKey::Sex),
            b"status" => Some(GroupKey::Status),
            b"country" => Some(GroupKey::Country),
            b"city" => Some(GroupKey::City),
            b"interests" => Some(GroupKey::Interests),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GroupKey::Sex => "sex",
            GroupKey::Status => "status",
            GroupKey::Country => "country",
            GroupKey::City => "city",
            GroupKey::Interests => "interests",
        }
    }
}

/// The `keys=` list of a group request, in the order given.
///
/// Every key appears at most once, so the list never holds more than five.
#[derive(Debug, Clone, Copy)]
pub struct GroupKeys {
    keys: [GroupKey; GroupKeys::MAX],
    len: u8,
}

impl GroupKeys {
    pub const MAX: usize = 5;

    pub const fn new() -> Self {
        Self {
            keys: [GroupKey::Sex; Self::MAX],
            len: 0,
        }
    }

    /// Appends `key`, returning `false` if it is already listed.
    pub fn push(&mut self, key: GroupKey) -> bool {
        if self.contains(key) {
            return false;
        }
        // Five distinct keys exist, so a new one always fits.
        self.keys[self.len as usize] = key;
        self.len += 1;
        true
    }

    pub fn contains(&self, key: GroupKey) -> bool {
        self.as_slice().contains(&key)
    }

    #[inline]
    pub fn as_slice(&self) -> &[GroupKey] {
        &self.keys[..self.len as usize]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = GroupKey> + '_ {
        self.as_slice().iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Bit `k` is set when key `k` is listed, regardless of order.
    pub fn mask(&self) -> u16 {
        self.iter().fold(0, |m, k| m | 1 << k as u16)
    }
}

impl Default for GroupKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for GroupKeys {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for GroupKeys {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Order {
    #[default]
    Asc = 0,
    Desc = 1,
}

/// Parameters of group, recommend and suggest requests.
///
/// `birth` and `joined` are calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicParams {
    pub present: BasicFlags,

    pub keys: GroupKeys,
    pub sex: Sex,
    pub status: Status,
    pub country: StringRef,
    pub city: StringRef,
    pub interests: StringRef,
    pub birth: i32,
    pub joined: i32,
    pub likes: u32,
    pub order: Order,
    pub limit: u32,
}

impl BasicParams {
    #[inline]
    pub fn has(&self, flags: BasicFlags) -> bool {
        self.present.contains(flags)
    }
}

/// Query parameters, shaped by the request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Params {
    /// The kind takes no typed parameters.
    #[default]
    None,
    Filter(FilterParams),
    Basic(BasicParams),
}

impl Params {
    pub(crate) fn for_kind(kind: RequestKind) -> Params {
        match kind {
            RequestKind::Filter => Params::Filter(FilterParams::default()),
            RequestKind::Group | RequestKind::Recommend | RequestKind::Suggest => {
                Params::Basic(BasicParams::default())
            }
            _ => Params::None,
        }
    }
}

/// A decoded request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Correlation number chosen by the caller. Decoding never touches it.
    pub request_id: u32,
    pub kind: RequestKind,
    pub method: Method,
    /// The `{id}` path segment, if the endpoint has one.
    pub entity_id: Option<u32>,
    /// The `query_id` parameter, accepted on every endpoint.
    pub query_id: Option<u32>,
    /// Value of the `Content-Length` header, `0` when absent.
    pub content_length: usize,
    pub params: Params,

    arena: ByteArena,
}

impl Request {
    pub fn new() -> Self {
        Self::with_options(&DecoderOptions::default())
    }

    pub fn with_options(options: &DecoderOptions) -> Self {
        Self {
            request_id: 0,
            kind: RequestKind::Invalid,
            method: Method::Unknown,
            entity_id: None,
            query_id: None,
            content_length: 0,
            params: Params::None,
            arena: ByteArena::with_capacity(options.arena_capacity),
        }
    }

    /// Clears every decoded field and rewinds the arena. `request_id` is
    /// kept.
    pub fn reset(&mut self) {
        self.kind = RequestKind::Invalid;
        self.method = Method::Unknown;
        self.entity_id = None;
        self.query_id = None;
        self.content_length = 0;
        self.params = Params::None;
        self.arena.reset();
    }

    /// Raw presence mask of whichever parameter set is active.
    pub fn mask(&self) -> u32 {
        match &self.params {
            Params::None => 0,
            Params::Filter(f) => f.present.bits(),
            Params::Basic(b) => b.present.bits(),
        }
    }

    pub fn filter(&self) -> Option<&FilterParams> {
        match &self.params {
            Params::Filter(f) => Some(f),
            _ => None,
        }
    }

    pub fn basic(&self) -> Option<&BasicParams> {
        match &self.params {
            Params::Basic(b) => Some(b),
            _ => None,
        }
    }

    #[inline]
    pub fn view(&self, r: StringRef) -> &[u8] {
        self.arena.view(r)
    }

    #[inline]
    pub fn get(&self, r: StringRef) -> Option<&[u8]> {
        self.arena.get(r)
    }

    pub fn text(&self, r: StringRef) -> Option<&str> {
        core::str::from_utf8(self.arena.get(r)?).ok()
    }

    /// Iterates over the non-empty comma-separated items of a list value.
    pub fn split_list(&self, r: StringRef) -> impl Iterator<Item = &[u8]> + '_ {
        self.view(r)
            .split_str(b",")
            .filter(|item| !item.is_empty())
    }

    /// The body following a head that consumed `consumed` bytes of `input`,
    /// once all `content_length` bytes of it are present.
    pub fn body<'a>(&self, input: &'a [u8], consumed: usize) -> Option<&'a [u8]> {
        let end = consumed.checked_add(self.content_length)?;
        input.get(consumed..end)
    }

    #[inline]
    pub fn arena(&self) -> &ByteArena {
        &self.arena
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
