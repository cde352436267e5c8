//! The account record and its decoder.
//!
//! An [`Account`] is a fixed set of scalar fields plus [`StringRef`]s into a
//! private [`ByteArena`]. Interests are stored as fencepost offsets: `k`
//! interests are `k + 1` cumulative arena offsets, and interest `i` spans
//! `[interests[i], interests[i + 1])`.

mod decoder;


use alloc::vec::Vec;

pub use decoder::RecordDecoder;

use crate::{
    INVALID_TIMESTAMP, Timestamp,
    arena::{ByteArena, StringRef},
    calendar::Calendar,
    error::ArenaError,
    options::DecoderOptions,
};

/// Sentinel for an account id that was not present. An explicit
/// `"id": 4294967295` reads back as absent.
pub const INVALID_ID: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Sex {
    Female = 0,
    Male = 1,
    #[default]
    Invalid = u8::MAX,
}

impl Sex {
    /// Parses the single-letter wire form, `m` or `f`.
    pub fn from_code(code: &[u8]) -> Option<Sex> {
        match code {
            b"m" => Some(Sex::Male),
            b"f" => Some(Sex::Female),
            _ => None,
        }
    }

    pub fn code(self) -> Option<&'static str> {
        match self {
            Sex::Male => Some("m"),
            Sex::Female => Some("f"),
            Sex::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Status {
    Free = 0,
    Complicated = 1,
    Occupied = 2,
    #[default]
    Invalid = u8::MAX,
}

impl Status {
    const FREE: &'static str = "свободны";
    const OCCUPIED: &'static str = "заняты";
    const COMPLICATED: &'static str = "всё сложно";

    /// Parses the UTF-8 wire literal.
    pub fn from_literal(literal: &[u8]) -> Option<Status> {
        if literal == Self::FREE.as_bytes() {
            Some(Status::Free)
        } else if literal == Self::OCCUPIED.as_bytes() {
            Some(Status::Occupied)
        } else if literal == Self::COMPLICATED.as_bytes() {
            Some(Status::Complicated)
        } else {
            None
        }
    }

    pub fn literal(self) -> Option<&'static str> {
        match self {
            Status::Free => Some(Self::FREE),
            Status::Occupied => Some(Self::OCCUPIED),
            Status::Complicated => Some(Self::COMPLICATED),
            Status::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Like {
    pub to_id: u32,
    pub ts: Timestamp,
}

/// Premium subscription interval. Both ends are absent together or present
/// together after a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Premium {
    pub start: Timestamp,
    pub finish: Timestamp,
}

impl Premium {
    pub const ABSENT: Premium = Premium {
        start: INVALID_TIMESTAMP,
        finish: INVALID_TIMESTAMP,
    };

    #[inline]
    pub fn is_present(&self) -> bool {
        self.start != INVALID_TIMESTAMP && self.finish != INVALID_TIMESTAMP
    }

    /// Whether `now` falls inside `[start, finish)`.
    #[inline]
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.is_present() && self.start <= now && now < self.finish
    }
}

impl Default for Premium {
    fn default() -> Self {
        Self::ABSENT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// [`INVALID_ID`] when absent.
    pub id: u32,
    pub sex: Sex,
    pub status: Status,

    /// [`INVALID_TIMESTAMP`] when absent, or when the record holds
    /// `i32::MAX` itself.
    pub joined: Timestamp,
    /// Same sentinel as `joined`.
    pub birth: Timestamp,
    pub premium: Premium,

    pub fname: StringRef,
    pub sname: StringRef,
    pub country: StringRef,
    pub city: StringRef,
    pub phone: StringRef,
    pub email: StringRef,

    interests: Vec<u32>,
    likes: Vec<Like>,

    arena: ByteArena,
}

impl Account {
    pub fn new() -> Self {
        Self::with_options(&DecoderOptions::default())
    }

    pub fn with_options(options: &DecoderOptions) -> Self {
        Self {
            id: INVALID_ID,
            sex: Sex::Invalid,
            status: Status::Invalid,
            joined: INVALID_TIMESTAMP,
            birth: INVALID_TIMESTAMP,
            premium: Premium::ABSENT,
            fname: StringRef::ABSENT,
            sname: StringRef::ABSENT,
            country: StringRef::ABSENT,
            city: StringRef::ABSENT,
            phone: StringRef::ABSENT,
            email: StringRef::ABSENT,
            interests: Vec::new(),
            likes: Vec::new(),
            arena: ByteArena::with_capacity(options.arena_capacity),
        }
    }

    /// Resets every field to its sentinel and empties both lists.
    ///
    /// The arena is left alone; [`RecordDecoder::decode`] rewinds it before
    /// writing a new record.
    pub fn clear(&mut self) {
        self.id = INVALID_ID;
        self.sex = Sex::Invalid;
        self.status = Status::Invalid;
        self.joined = INVALID_TIMESTAMP;
        self.birth = INVALID_TIMESTAMP;
        self.premium = Premium::ABSENT;

        self.fname = StringRef::ABSENT;
        self.sname = StringRef::ABSENT;
        self.country = StringRef::ABSENT;
        self.city = StringRef::ABSENT;
        self.phone = StringRef::ABSENT;
        self.email = StringRef::ABSENT;

        self.interests.clear();
        self.likes.clear();
    }

    #[inline]
    pub fn interests_count(&self) -> usize {
        self.interests.len().saturating_sub(1)
    }

    /// The arena ref of interest `idx`, or `None` past the end.
    pub fn interest(&self, idx: usize) -> Option<StringRef> {
        let start = *self.interests.get(idx)?;
        let end = *self.interests.get(idx + 1)?;
        Some(StringRef::from_bounds(start, end))
    }

    /// Iterates over the decoded bytes of every interest.
    pub fn interests(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        self.interests
            .windows(2)
            .map(|w| self.arena.view(StringRef::from_bounds(w[0], w[1])))
    }

    /// Appends an interest that was just written to the arena.
    ///
    /// Interests must be written back to back: `r` has to start where the
    /// previous one ended.
    pub(crate) fn push_interest(&mut self, r: StringRef) {
        if self.interests.is_empty() {
            self.interests.push(r.offset());
        }
        debug_assert_eq!(self.interests.last().copied(), Some(r.offset()));
        self.interests.push(r.offset() + r.len());
    }

    pub(crate) fn clear_interests(&mut self) {
        self.interests.clear();
    }

    #[inline]
    pub fn likes(&self) -> &[Like] {
        &self.likes
    }

    pub fn add_like(&mut self, like: Like) {
        self.likes.push(like);
    }

    pub(crate) fn clear_likes(&mut self) {
        self.likes.clear();
    }

    /// Borrows the bytes behind `r`. Absent refs yield an empty slice.
    #[inline]
    pub fn view(&self, r: StringRef) -> &[u8] {
        self.arena.view(r)
    }

    /// Borrows the bytes behind `r`, or `None` if the field is absent.
    #[inline]
    pub fn get(&self, r: StringRef) -> Option<&[u8]> {
        self.arena.get(r)
    }

    /// Borrows the text behind `r` if it is present and valid UTF-8.
    pub fn text(&self, r: StringRef) -> Option<&str> {
        core::str::from_utf8(self.arena.get(r)?).ok()
    }

    #[inline]
    pub fn arena(&self) -> &ByteArena {
        &self.arena
    }

    #[inline]
    pub(crate) fn arena_mut(&mut self) -> &mut ByteArena {
        &mut self.arena
    }

    /// Writes raw bytes to the arena, for building records by hand.
    pub fn intern(&mut self, bytes: &[u8]) -> Result<StringRef, ArenaError> {
        let start = self.arena.cursor();
        self.arena.extend(bytes)?;
        Ok(self.arena.finish(start))
    }

    pub fn birth_year(&self) -> Option<i32> {
        (self.birth != INVALID_TIMESTAMP).then(|| Calendar::from_timestamp(self.birth).year)
    }

    pub fn joined_year(&self) -> Option<i32> {
        (self.joined != INVALID_TIMESTAMP).then(|| Calendar::from_timestamp(self.joined).year)
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}
