//! Bulk decoding of account data files.
//!
//! A data file is one JSON document holding an array of account records,
//! typically `{"accounts": [{...}, {...}]}`. [`AccountStream`] finds the
//! array and decodes its records one at a time into a caller-owned
//! [`Account`]. A record that fails to decode is skipped, and decoding
//! resumes at the next record.

use bstr::ByteSlice;

use crate::{
    account::{Account, RecordDecoder},
    error::{Progress, RecordError},
    options::DecoderOptions,
};

/// What [`AccountStream::next_into`] did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamItem {
    /// The account now holds the record.
    Decoded,
    /// The record was malformed and has been stepped over. The account
    /// holds garbage, and offsets in the error count from the record's
    /// opening brace.
    Skipped(RecordError),
}

/// Finds the end of the object or array opening at `start`, balancing
/// brackets and stepping over strings. Returns `None` if the input ends
/// first.
fn skip_balanced(input: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut p = start;
    while p < input.len() {
        match input[p] {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(p + 1);
                }
            }
            b'"' => {
                p += 1;
                loop {
                    match *input.get(p)? {
                        b'"' => break,
                        b'\\' => p += 2,
                        _ => p += 1,
                    }
                }
            }
            _ => {}
        }
        p += 1;
    }
    None
}

/// Decodes the records of an account array one by one.
///
/// ```
/// use hlwire::{Account, AccountStream, DecoderOptions, StreamItem};
///
/// let data = br#"{"accounts": [{"id": 1}, {"id": 2, "sex": "?"}, {"id": 3}]}"#;
/// let mut stream = AccountStream::new(data, DecoderOptions::default());
/// let mut account = Account::new();
/// let mut ids = Vec::new();
/// while let Some(item) = stream.next_into(&mut account) {
///     if item == StreamItem::Decoded {
///         ids.push(account.id);
///     }
/// }
/// assert_eq!(ids, [1, 3]);
/// assert_eq!(stream.skipped(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct AccountStream<'a> {
    input: &'a [u8],
    pos: usize,
    decoder: RecordDecoder,
    decoded: usize,
    skipped: usize,
    truncated: bool,
}

impl<'a> AccountStream<'a> {
    /// Positions the stream at the first record after the first `[`.
    pub fn new(input: &'a [u8], options: DecoderOptions) -> Self {
        let pos = input.find_byte(b'[').map_or(input.len(), |p| p + 1);
        Self {
            input,
            pos,
            decoder: RecordDecoder::new(options),
            decoded: 0,
            skipped: 0,
            truncated: false,
        }
    }

    /// Moves to the next `{`. Returns `false` at the end of the array or
    /// the input, after which the stream stays exhausted.
    fn seek_record(&mut self) -> bool {
        match self.input[self.pos..].find_byteset(b"{]") {
            Some(off) if self.input[self.pos + off] == b'{' => {
                self.pos += off;
                true
            }
            // The closing `]`, or nothing: either way the array is done.
            _ => {
                self.pos = self.input.len();
                false
            }
        }
    }

    /// Decodes the next record into `account`.
    ///
    /// Returns `None` once the array is exhausted. A record cut off by the
    /// end of the input also ends the stream; see
    /// [`is_truncated`](Self::is_truncated).
    pub fn next_into(&mut self, account: &mut Account) -> Option<StreamItem> {
        if self.truncated || !self.seek_record() {
            return None;
        }
        let start = self.pos;
        match self.decoder.decode(&self.input[start..], account) {
            Ok(Progress::Complete(consumed)) => {
                self.pos = start + consumed;
                self.decoded += 1;
                Some(StreamItem::Decoded)
            }
            Ok(Progress::Incomplete(_)) => {
                tracing::debug!(offset = start, "account data ends inside a record");
                self.truncated = true;
                self.pos = self.input.len();
                None
            }
            Err(err) => {
                tracing::debug!(offset = start, %err, "skipping malformed account");
                self.skipped += 1;
                match skip_balanced(self.input, start) {
                    Some(end) => self.pos = end,
                    None => {
                        self.truncated = true;
                        self.pos = self.input.len();
                    }
                }
                Some(StreamItem::Skipped(err))
            }
        }
    }

    /// Decodes every remaining record, calling `f` with each one that
    /// decoded. Returns the number of records passed to `f`.
    pub fn for_each_account(&mut self, account: &mut Account, mut f: impl FnMut(&Account)) -> usize {
        let mut n = 0;
        while let Some(item) = self.next_into(account) {
            if item == StreamItem::Decoded {
                f(account);
                n += 1;
            }
        }
        n
    }

    /// Records decoded so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Malformed records stepped over so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Whether the input ended in the middle of a record.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Byte offset the stream has reached.
    pub fn position(&self) -> usize {
        self.pos
    }
}
