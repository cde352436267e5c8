//! Account record decoder.
//!
//! Decodes exactly one flat JSON object of the account schema. The object is
//! walked with a small explicit state machine; each field value is decoded by
//! a grammar chosen from the field name:
//!
//! | field                                            | value                      |
//! |--------------------------------------------------|----------------------------|
//! | `id`, `birth`, `joined`                          | signed decimal integer     |
//! | `fname`, `sname`, `country`, `city`, `phone`, `email` | string                |
//! | `sex`                                            | `"m"` or `"f"`             |
//! | `status`                                         | one of three literals      |
//! | `premium`                                        | `{"start": n, "finish": n}`|
//! | `interests`                                      | array of strings           |
//! | `likes`                                          | array of `{"id": n, "ts": n}` |
//!
//! Values of any other field are skipped without being decoded.
//!
//! Running out of input is reported as [`Progress::Incomplete`]; the decoder
//! keeps no state between calls, so the caller simply retries with a longer
//! buffer.

use crate::{
    Timestamp,
    account::{Account, Like, Premium, Sex, Status},
    arena::StringRef,
    error::{ArenaError, Progress, RecordError},
    escape::{JsonString, decode_json_string},
    options::DecoderOptions,
};

/// Why decoding stopped early. Internal; split into `Progress` and
/// `RecordError` at the API boundary.
#[derive(Debug)]
enum Stop {
    Incomplete(usize),
    Error(RecordError),
}

impl From<RecordError> for Stop {
    fn from(err: RecordError) -> Self {
        Stop::Error(err)
    }
}

impl From<ArenaError> for Stop {
    fn from(err: ArenaError) -> Self {
        Stop::Error(err.into())
    }
}

type Step<T> = Result<T, Stop>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Sex,
    Status,
    Fname,
    Sname,
    Country,
    City,
    Phone,
    Email,
    Birth,
    Joined,
    Premium,
    Interests,
    Likes,
    Unknown,
}

impl Field {
    fn from_name(name: &[u8]) -> Field {
        match name {
            b"id" => Field::Id,
            b"sex" => Field::Sex,
            b"status" => Field::Status,
            b"fname" => Field::Fname,
            b"sname" => Field::Sname,
            b"country" => Field::Country,
            b"city" => Field::City,
            b"phone" => Field::Phone,
            b"email" => Field::Email,
            b"birth" => Field::Birth,
            b"joined" => Field::Joined,
            b"premium" => Field::Premium,
            b"interests" => Field::Interests,
            b"likes" => Field::Likes,
            _ => Field::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectOpenBrace,
    ExpectFieldNameOrCloseBrace,
    /// After a comma a closing brace is not allowed.
    ExpectFieldName,
    ExpectColon(Field),
    ExpectValue(Field),
    ExpectCommaOrCloseBrace,
}

/// Byte cursor over one input buffer.
struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    fn peek(&self) -> Step<u8> {
        self.input.get(self.pos).copied().ok_or(Stop::Incomplete(1))
    }

    #[inline]
    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\n' | b'\r' | b'\t') = self.input.get(self.pos) {
            self.pos += 1;
        }
    }

    /// Skips whitespace and returns the next byte without consuming it.
    #[inline]
    fn peek_token(&mut self) -> Step<u8> {
        self.skip_ws();
        self.peek()
    }

    #[inline]
    fn unexpected(&self, byte: u8) -> Stop {
        Stop::Error(RecordError::UnexpectedByte {
            byte,
            offset: self.pos,
        })
    }

    /// Skips whitespace and consumes `expected`.
    fn expect(&mut self, expected: u8) -> Step<()> {
        match self.peek_token()? {
            b if b == expected => {
                self.pos += 1;
                Ok(())
            }
            b => Err(self.unexpected(b)),
        }
    }

    /// Consumes a string without decoding it and returns its raw body.
    fn raw_string(&mut self) -> Step<&'a [u8]> {
        self.expect(b'"')?;
        let start = self.pos;
        let mut p = start;
        while let Some(&b) = self.input.get(p) {
            match b {
                b'"' => {
                    self.pos = p + 1;
                    return Ok(&self.input[start..p]);
                }
                b'\\' => p += 2,
                _ => p += 1,
            }
        }
        Err(Stop::Incomplete(1))
    }

    /// Consumes an optionally signed decimal integer.
    fn integer(&mut self) -> Step<i64> {
        self.skip_ws();
        let start = self.pos;
        let mut p = start;
        let negative = match self.input.get(p) {
            Some(b'-') => {
                p += 1;
                true
            }
            Some(b'+') => {
                p += 1;
                false
            }
            _ => false,
        };

        let digits_start = p;
        let mut value: i64 = 0;
        let mut overflow = false;
        while let Some(&b) = self.input.get(p) {
            if !b.is_ascii_digit() {
                break;
            }
            let digit = i64::from(b - b'0');
            match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => value = v,
                None => overflow = true,
            }
            p += 1;
        }

        if p == self.input.len() {
            // The number may continue in bytes we have not seen yet.
            return Err(Stop::Incomplete(1));
        }
        if p == digits_start {
            return Err(RecordError::InvalidNumber { offset: start }.into());
        }
        if overflow {
            return Err(RecordError::NumberOverflow { offset: start }.into());
        }
        self.pos = p;
        Ok(if negative { -value } else { value })
    }

    fn timestamp(&mut self) -> Step<Timestamp> {
        let offset = self.pos;
        let v = self.integer()?;
        Timestamp::try_from(v).map_err(|_| RecordError::NumberOverflow { offset }.into())
    }

    fn uint(&mut self) -> Step<u32> {
        let offset = self.pos;
        let v = self.integer()?;
        u32::try_from(v).map_err(|_| RecordError::NumberOverflow { offset }.into())
    }

    /// Skips one value of any shape, checking that brackets balance.
    fn skip_value(&mut self, max_nesting: usize) -> Step<()> {
        // Bounded by the width of `kinds`.
        let max_nesting = max_nesting.clamp(1, 64);
        // Bit `i` is set when nesting level `i` was opened by `{`.
        let mut kinds: u64 = 0;
        let mut depth = 0usize;

        loop {
            let b = self.peek_token()?;
            match b {
                b'"' => {
                    self.raw_string()?;
                }
                b'{' | b'[' => {
                    if depth == max_nesting {
                        return Err(RecordError::DepthExceeded {
                            limit: max_nesting,
                            offset: self.pos,
                        }
                        .into());
                    }
                    if b == b'{' {
                        kinds |= 1 << depth;
                    } else {
                        kinds &= !(1 << depth);
                    }
                    depth += 1;
                    self.pos += 1;
                    continue;
                }
                b'}' | b']' if depth > 0 => {
                    let opened_brace = kinds & (1 << (depth - 1)) != 0;
                    if opened_brace != (b == b'}') {
                        return Err(self.unexpected(b));
                    }
                    depth -= 1;
                    self.pos += 1;
                }
                b',' | b':' if depth > 0 => {
                    self.pos += 1;
                    continue;
                }
                b'}' | b']' | b',' | b':' => return Err(self.unexpected(b)),
                _ => self.scalar()?,
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Skips a bare scalar such as a number, `true`, or `null`.
    fn scalar(&mut self) -> Step<()> {
        let start = self.pos;
        while let Some(&b) = self.input.get(self.pos) {
            if matches!(b, b',' | b'}' | b']' | b':' | b' ' | b'\n' | b'\r' | b'\t' | b'"') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == self.input.len() {
            return Err(Stop::Incomplete(1));
        }
        if self.pos == start {
            return Err(self.unexpected(self.input[start]));
        }
        Ok(())
    }
}

/// Decodes account records into a reusable [`Account`].
///
/// A decoder holds only its options, so one instance can be shared by any
/// number of sequential decodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDecoder {
    options: DecoderOptions,
}

impl RecordDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decodes the object at the start of `input` (after optional
    /// whitespace) into `account`.
    ///
    /// `account` is cleared and its arena rewound first. On
    /// [`Progress::Complete`] the count of consumed bytes includes the closing
    /// brace. On [`Progress::Incomplete`] or an error, `account` holds
    /// whatever was decoded before the stop and must not be used.
    pub fn decode(&self, input: &[u8], account: &mut Account) -> Result<Progress, RecordError> {
        account.clear();
        account.arena_mut().reset();

        let mut cur = Cursor { input, pos: 0 };
        match self.object(&mut cur, account) {
            Ok(()) => {
                tracing::trace!(id = account.id, consumed = cur.pos, "decoded account");
                Ok(Progress::Complete(cur.pos))
            }
            Err(Stop::Incomplete(n)) => Ok(Progress::Incomplete(n)),
            Err(Stop::Error(err)) => Err(err),
        }
    }

    fn object(&self, cur: &mut Cursor<'_>, account: &mut Account) -> Step<()> {
        let mut state = State::ExpectOpenBrace;
        loop {
            state = match state {
                State::ExpectOpenBrace => {
                    cur.expect(b'{')?;
                    State::ExpectFieldNameOrCloseBrace
                }
                State::ExpectFieldNameOrCloseBrace => match cur.peek_token()? {
                    b'}' => {
                        cur.pos += 1;
                        return Ok(());
                    }
                    b'"' => State::ExpectColon(Field::from_name(cur.raw_string()?)),
                    b => return Err(cur.unexpected(b)),
                },
                State::ExpectFieldName => match cur.peek_token()? {
                    b'"' => State::ExpectColon(Field::from_name(cur.raw_string()?)),
                    b => return Err(cur.unexpected(b)),
                },
                State::ExpectColon(field) => {
                    cur.expect(b':')?;
                    State::ExpectValue(field)
                }
                State::ExpectValue(field) => {
                    // Error offsets point at the value, not the gap before it.
                    cur.skip_ws();
                    self.value(field, cur, account)?;
                    State::ExpectCommaOrCloseBrace
                }
                State::ExpectCommaOrCloseBrace => match cur.peek_token()? {
                    b',' => {
                        cur.pos += 1;
                        State::ExpectFieldName
                    }
                    b'}' => {
                        cur.pos += 1;
                        return Ok(());
                    }
                    b => return Err(cur.unexpected(b)),
                },
            };
        }
    }

    fn value(&self, field: Field, cur: &mut Cursor<'_>, account: &mut Account) -> Step<()> {
        match field {
            Field::Id => account.id = cur.uint()?,
            Field::Birth => account.birth = cur.timestamp()?,
            Field::Joined => account.joined = cur.timestamp()?,
            Field::Fname => account.fname = self.string(cur, account)?,
            Field::Sname => account.sname = self.string(cur, account)?,
            Field::Country => account.country = self.string(cur, account)?,
            Field::City => account.city = self.string(cur, account)?,
            Field::Phone => account.phone = self.string(cur, account)?,
            Field::Email => account.email = self.string(cur, account)?,
            Field::Sex => {
                let offset = cur.pos;
                let r = self.string(cur, account)?;
                let sex = Sex::from_code(account.view(r));
                account.arena_mut().truncate(r.offset());
                account.sex = sex.ok_or(RecordError::InvalidSex { offset })?;
            }
            Field::Status => {
                let offset = cur.pos;
                let r = self.string(cur, account)?;
                let status = Status::from_literal(account.view(r));
                account.arena_mut().truncate(r.offset());
                account.status = status.ok_or(RecordError::InvalidStatus { offset })?;
            }
            Field::Premium => account.premium = self.premium(cur)?,
            Field::Interests => self.interests(cur, account)?,
            Field::Likes => self.likes(cur, account)?,
            Field::Unknown => cur.skip_value(self.options.max_nesting)?,
        }
        Ok(())
    }

    fn string(&self, cur: &mut Cursor<'_>, account: &mut Account) -> Step<StringRef> {
        cur.expect(b'"')?;
        let decoded = decode_json_string(
            cur.input,
            &mut cur.pos,
            account.arena_mut(),
            self.options.combine_surrogates,
        )?;
        match decoded {
            JsonString::Complete(r) => Ok(r),
            JsonString::Incomplete(n) => Err(Stop::Incomplete(n)),
        }
    }

    /// Visits the members of an object, handing each key to `member`, which
    /// must consume the value.
    fn members<'a, F>(cur: &mut Cursor<'a>, mut member: F) -> Step<()>
    where
        F: FnMut(&[u8], &mut Cursor<'a>) -> Step<()>,
    {
        cur.expect(b'{')?;
        if cur.peek_token()? == b'}' {
            cur.pos += 1;
            return Ok(());
        }
        loop {
            let key = cur.raw_string()?;
            cur.expect(b':')?;
            member(key, cur)?;
            match cur.peek_token()? {
                b',' => cur.pos += 1,
                b'}' => {
                    cur.pos += 1;
                    return Ok(());
                }
                b => return Err(cur.unexpected(b)),
            }
        }
    }

    /// Visits the elements of an array; `element` must consume each one.
    fn elements<'a, F>(cur: &mut Cursor<'a>, mut element: F) -> Step<()>
    where
        F: FnMut(&mut Cursor<'a>) -> Step<()>,
    {
        cur.expect(b'[')?;
        if cur.peek_token()? == b']' {
            cur.pos += 1;
            return Ok(());
        }
        loop {
            element(cur)?;
            match cur.peek_token()? {
                b',' => cur.pos += 1,
                b']' => {
                    cur.pos += 1;
                    return Ok(());
                }
                b => return Err(cur.unexpected(b)),
            }
        }
    }

    fn premium(&self, cur: &mut Cursor<'_>) -> Step<Premium> {
        let max_nesting = self.options.max_nesting;
        let mut premium = Premium::ABSENT;
        Self::members(cur, |key, cur| {
            match key {
                b"start" => premium.start = cur.timestamp()?,
                b"finish" => premium.finish = cur.timestamp()?,
                _ => cur.skip_value(max_nesting)?,
            }
            Ok(())
        })?;
        Ok(if premium.is_present() {
            premium
        } else {
            Premium::ABSENT
        })
    }

    fn interests(&self, cur: &mut Cursor<'_>, account: &mut Account) -> Step<()> {
        // A repeated field replaces the earlier list.
        account.clear_interests();
        Self::elements(cur, |cur| {
            let r = self.string(cur, account)?;
            account.push_interest(r);
            Ok(())
        })
    }

    fn likes(&self, cur: &mut Cursor<'_>, account: &mut Account) -> Step<()> {
        account.clear_likes();
        let max_nesting = self.options.max_nesting;
        Self::elements(cur, |cur| {
            let offset = cur.pos;
            let mut to_id = None;
            let mut ts = None;
            Self::members(cur, |key, cur| {
                match key {
                    b"id" => to_id = Some(cur.uint()?),
                    b"ts" => ts = Some(cur.timestamp()?),
                    _ => cur.skip_value(max_nesting)?,
                }
                Ok(())
            })?;
            match (to_id, ts) {
                (Some(to_id), Some(ts)) => {
                    account.add_like(Like { to_id, ts });
                    Ok(())
                }
                _ => Err(RecordError::IncompleteLike { offset }.into()),
            }
        })
    }
}
