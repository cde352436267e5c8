use crate::arena::DEFAULT_ARENA_CAPACITY;

/// Configuration shared by the record and request decoders.
///
/// # Default
///
/// An 8 KiB arena ceiling, 64 levels of nesting for skipped values, and
/// surrogate-pair combining enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Ceiling, in bytes, of the arena owned by each [`Account`] and
    /// [`Request`].
    ///
    /// A record or request whose decoded strings do not fit fails with
    /// [`ArenaError::CapacityExceeded`].
    ///
    /// # Default
    ///
    /// `8192`
    ///
    /// [`Account`]: crate::Account
    /// [`Request`]: crate::Request
    /// [`ArenaError::CapacityExceeded`]: crate::ArenaError::CapacityExceeded
    pub arena_capacity: usize,

    /// Deepest nesting of objects and arrays accepted while skipping the
    /// value of an unknown record field. Values above `64` are treated as
    /// `64`, and `0` as `1`.
    ///
    /// # Default
    ///
    /// `64`
    pub max_nesting: usize,

    /// Whether a `\uD800`-`\uDBFF` escape immediately followed by a
    /// `\uDC00`-`\uDFFF` escape is decoded as a single code point.
    ///
    /// When `false`, each escape is encoded on its own, which yields invalid
    /// UTF-8 for characters outside the basic multilingual plane.
    ///
    /// # Default
    ///
    /// `true`
    pub combine_surrogates: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            max_nesting: 64,
            combine_surrogates: true,
        }
    }
}
