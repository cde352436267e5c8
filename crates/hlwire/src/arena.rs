//! Byte arena backing every decoded string.
//!
//! Decoders never hand out owned strings. They append decoded bytes to a
//! [`ByteArena`] and return a [`StringRef`], an `(offset, len)` pair that is
//! only meaningful together with the arena that issued it.
//!
//! Offsets are indices, so they survive any reallocation of the backing
//! vector. They stay valid until [`ByteArena::reset`] rewinds the cursor.
//!
//! The arena has a hard capacity ceiling chosen at construction. Writes that
//! would cross it fail with [`ArenaError::CapacityExceeded`] and leave the
//! arena untouched.

use alloc::vec::Vec;
use core::ops::Range;

use crate::error::ArenaError;

/// Default ceiling for record and request arenas.
pub const DEFAULT_ARENA_CAPACITY: usize = 8192;

/// An `(offset, len)` handle into a [`ByteArena`].
///
/// The reserved offset `u32::MAX` marks an absent value, which is also the
/// [`Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringRef {
    offset: u32,
    len: u32,
}

impl StringRef {
    /// Sentinel for a field that was not present in the input.
    pub const ABSENT: StringRef = StringRef {
        offset: u32::MAX,
        len: 0,
    };

    #[inline]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Builds a ref spanning `[start, end)`.
    #[inline]
    pub const fn from_bounds(start: u32, end: u32) -> Self {
        Self {
            offset: start,
            len: end - start,
        }
    }

    #[inline]
    pub const fn offset(self) -> u32 {
        self.offset
    }

    #[inline]
    pub const fn len(self) -> u32 {
        self.len
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn is_absent(self) -> bool {
        self.offset == u32::MAX
    }

    #[inline]
    pub const fn is_present(self) -> bool {
        !self.is_absent()
    }

    #[inline]
    fn range(self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.len as usize
    }
}

impl Default for StringRef {
    fn default() -> Self {
        Self::ABSENT
    }
}

/// Growable byte buffer with a single write cursor and a fixed ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteArena {
    data: Vec<u8>,
    capacity: usize,
}

impl ByteArena {
    /// Creates an arena that accepts at most `capacity` bytes.
    ///
    /// The whole capacity is reserved up front. Capacities that do not fit
    /// the `u32` offset space are clamped to it.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize - 1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// The next free offset.
    #[inline]
    pub fn cursor(&self) -> u32 {
        // Never exceeds `capacity`, which is clamped below `u32::MAX`.
        self.data.len() as u32
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    #[inline]
    fn reserve(&self, n: usize) -> Result<(), ArenaError> {
        if n > self.remaining() {
            return Err(ArenaError::CapacityExceeded {
                requested: self.data.len() + n,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Reserves `n` zeroed bytes at the cursor and returns their offset.
    pub fn allocate(&mut self, n: usize) -> Result<u32, ArenaError> {
        self.reserve(n)?;
        let offset = self.cursor();
        self.data.resize(self.data.len() + n, 0);
        Ok(offset)
    }

    /// Appends one byte at the cursor.
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<(), ArenaError> {
        self.reserve(1)?;
        self.data.push(byte);
        Ok(())
    }

    /// Appends `bytes` at the cursor.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), ArenaError> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Completes an in-place write that started at `start`, returning a ref
    /// over everything appended since.
    #[inline]
    pub fn finish(&self, start: u32) -> StringRef {
        StringRef::from_bounds(start, self.cursor())
    }

    /// Drops everything written after `offset`.
    ///
    /// Used to roll back a partially decoded value.
    pub fn truncate(&mut self, offset: u32) {
        self.data.truncate(offset as usize);
    }

    /// Rewinds the cursor to zero. All previously issued refs become stale.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Resolves `r`, returning `None` when it is absent or does not lie
    /// within the written part of this arena.
    #[inline]
    pub fn get(&self, r: StringRef) -> Option<&[u8]> {
        if r.is_absent() {
            return None;
        }
        self.data.get(r.range())
    }

    /// Resolves `r`, yielding an empty slice for absent or stale refs.
    #[inline]
    pub fn view(&self, r: StringRef) -> &[u8] {
        self.get(r).unwrap_or_default()
    }

    /// Mutable access to bytes previously returned by [`allocate`].
    ///
    /// [`allocate`]: ByteArena::allocate
    pub fn get_mut(&mut self, r: StringRef) -> Option<&mut [u8]> {
        if r.is_absent() {
            return None;
        }
        self.data.get_mut(r.range())
    }

    /// All bytes written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for ByteArena {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ARENA_CAPACITY)
    }
}
