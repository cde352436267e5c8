//! Escape decoding shared by the record and request decoders.
//!
//! Two dialects are handled:
//!
//! - JSON string bodies: backslash escapes, including `\uXXXX`, re-encoded as
//!   UTF-8 straight into a [`ByteArena`].
//! - URL query values: `%XX` and `+`, stopping at the next `&`, space, or NUL.
//!
//! Both decoders work on a `(input, pos)` pair, where `pos` is advanced past
//! whatever was consumed. Neither allocates outside the arena.
//!
//! # Leniency
//!
//! - Unknown JSON escapes such as `\q` decode to the escaped byte itself.
//! - Percent escapes with non-hex digits decode those digits as `0`
//!   (`%zz` → `0x00`). Malformed input produces garbage, never an error.
//! - A `\u` high surrogate followed by a `\u` low surrogate is combined into
//!   one code point when [`DecoderOptions::combine_surrogates`] is set. Lone
//!   surrogates are encoded on their own as three bytes, which is not valid
//!   UTF-8.
//!
//! [`DecoderOptions::combine_surrogates`]: crate::DecoderOptions::combine_surrogates

use bstr::ByteSlice;

use crate::{
    arena::{ByteArena, StringRef},
    error::{ArenaError, RecordError},
};

/// Replacement byte for every byte that may follow a backslash.
pub const ESCAPE_TABLE: [u8; 256] = build_escape_table();

const fn build_escape_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    table[b'b' as usize] = 0x08;
    table[b'f' as usize] = 0x0C;
    table[b'n' as usize] = b'\n';
    table[b'r' as usize] = b'\r';
    table[b't' as usize] = b'\t';
    table
}

/// Nibble values indexed by `(c - '0') & 0x3F`. Anything that is not a hex
/// digit lands on a zero entry.
pub const UNHEX_TABLE: [u8; 64] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 0, 0, 0, 0, 0, 0, 10, 11, 12, 13, 14, 15, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 10, 11, 12, 13, 14, 15, 0, 0, 0, 0, 0,
    0, 0, 0, 0,
];

#[inline]
pub fn hex_to_int(ch: u8) -> u8 {
    UNHEX_TABLE[(ch.wrapping_sub(b'0') & 0x3F) as usize]
}

#[inline]
fn strict_hex(ch: u8) -> Option<u32> {
    match ch {
        b'0'..=b'9' => Some(u32::from(ch - b'0')),
        b'a'..=b'f' => Some(u32::from(ch - b'a') + 10),
        b'A'..=b'F' => Some(u32::from(ch - b'A') + 10),
        _ => None,
    }
}

/// Encodes `cp` with the UTF-8 bit layout, returning the used prefix of
/// `buf`. Surrogates are encoded like any other code point.
#[inline]
pub fn encode_utf8(cp: u32, buf: &mut [u8; 4]) -> &[u8] {
    if cp < 0x80 {
        buf[0] = cp as u8;
        &buf[..1]
    } else if cp < 0x800 {
        buf[0] = 0xC0 | (cp >> 6) as u8;
        buf[1] = 0x80 | (cp & 0x3F) as u8;
        &buf[..2]
    } else if cp < 0x1_0000 {
        buf[0] = 0xE0 | (cp >> 12) as u8;
        buf[1] = 0x80 | ((cp >> 6) & 0x3F) as u8;
        buf[2] = 0x80 | (cp & 0x3F) as u8;
        &buf[..3]
    } else {
        debug_assert!(cp < 0x20_0000);
        buf[0] = 0xF0 | ((cp >> 18) & 0x07) as u8;
        buf[1] = 0x80 | ((cp >> 12) & 0x3F) as u8;
        buf[2] = 0x80 | ((cp >> 6) & 0x3F) as u8;
        buf[3] = 0x80 | (cp & 0x3F) as u8;
        &buf[..4]
    }
}

/// Outcome of [`decode_json_string`] when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonString {
    /// The closing quote was found.
    Complete(StringRef),
    /// The input ended first; at least this many more bytes are needed.
    Incomplete(usize),
}

enum Hex4 {
    Value(u32),
    Short(usize),
    Invalid,
}

fn read_hex4(input: &[u8], at: usize) -> Hex4 {
    let rest = input.get(at..).unwrap_or_default();
    let avail = rest.len().min(4);
    let mut v = 0u32;
    for &b in &rest[..avail] {
        match strict_hex(b) {
            Some(d) => v = (v << 4) | d,
            None => return Hex4::Invalid,
        }
    }
    if avail < 4 {
        Hex4::Short(4 - avail)
    } else {
        Hex4::Value(v)
    }
}

/// Decodes a JSON string body into `out`.
///
/// `*pos` must point just past the opening quote. On success it is moved
/// past the closing quote. On any other outcome `*pos` is left where it was
/// and `out` is rolled back, so the call can be repeated with more input.
pub fn decode_json_string(
    input: &[u8],
    pos: &mut usize,
    out: &mut ByteArena,
    combine_surrogates: bool,
) -> Result<JsonString, RecordError> {
    let start = out.cursor();
    let result = decode_json_string_inner(input, *pos, out, combine_surrogates);
    match result {
        Ok((JsonString::Complete(r), end)) => {
            *pos = end;
            Ok(JsonString::Complete(r))
        }
        Ok((incomplete, _)) => {
            out.truncate(start);
            Ok(incomplete)
        }
        Err(err) => {
            out.truncate(start);
            Err(err)
        }
    }
}

fn decode_json_string_inner(
    input: &[u8],
    mut p: usize,
    out: &mut ByteArena,
    combine_surrogates: bool,
) -> Result<(JsonString, usize), RecordError> {
    let start = out.cursor();
    let mut utf8 = [0u8; 4];

    while p < input.len() {
        // Copy the run of plain bytes in one go.
        let run = input[p..].find_byteset(b"\"\\").unwrap_or(input.len() - p);
        if run > 0 {
            out.extend(&input[p..p + run])?;
            p += run;
            continue;
        }

        match input[p] {
            b'"' => return Ok((JsonString::Complete(out.finish(start)), p + 1)),
            _ => {
                // Backslash.
                let esc_at = p;
                p += 1;
                let Some(&ch) = input.get(p) else {
                    return Ok((JsonString::Incomplete(1), p));
                };
                if ch != b'u' {
                    out.push(ESCAPE_TABLE[ch as usize])?;
                    p += 1;
                    continue;
                }

                p += 1;
                let mut cp = match read_hex4(input, p) {
                    Hex4::Value(v) => v,
                    Hex4::Short(n) => return Ok((JsonString::Incomplete(n), p)),
                    Hex4::Invalid => return Err(RecordError::InvalidUnicodeEscape { offset: esc_at }),
                };
                p += 4;

                if combine_surrogates && (0xD800..0xDC00).contains(&cp) {
                    match low_surrogate(input, p) {
                        Pair::Low(lo) => {
                            cp = 0x1_0000 + ((cp - 0xD800) << 10) + (lo - 0xDC00);
                            p += 6;
                        }
                        Pair::Short(n) => return Ok((JsonString::Incomplete(n), p)),
                        Pair::None => {}
                    }
                }

                out.extend(encode_utf8(cp, &mut utf8))?;
            }
        }
    }

    Ok((JsonString::Incomplete(1), p))
}

enum Pair {
    Low(u32),
    Short(usize),
    None,
}

/// Looks for a `\uDC00`..`\uDFFF` escape at `at`.
fn low_surrogate(input: &[u8], at: usize) -> Pair {
    let rest = &input[at.min(input.len())..];
    let head = &rest[..rest.len().min(2)];
    if !b"\\u".starts_with(head) {
        return Pair::None;
    }
    if head.len() < 2 {
        return Pair::Short(6 - head.len());
    }
    match read_hex4(input, at + 2) {
        Hex4::Value(lo) if (0xDC00..0xE000).contains(&lo) => Pair::Low(lo),
        Hex4::Short(n) => Pair::Short(n),
        Hex4::Value(_) | Hex4::Invalid => Pair::None,
    }
}

/// Outcome of [`decode_url_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlDecode {
    /// Stopped at a delimiter (`&`, space, or NUL), which is not consumed.
    /// Holds the number of bytes written.
    Complete(usize),
    /// The input ran out without a delimiter. Holds the number of bytes
    /// written. If no more input will arrive the value is complete.
    Exhausted(usize),
    /// A `%` escape is cut short; at least this many more bytes are needed.
    /// `*pos` is left on the `%` and everything before it has been written.
    NeedMoreInput(usize),
}

/// Percent-decodes a query value into `out`, starting at `*pos`.
pub fn decode_url_value(
    input: &[u8],
    pos: &mut usize,
    out: &mut ByteArena,
) -> Result<UrlDecode, ArenaError> {
    let mut written = 0;
    while let Some(&ch) = input.get(*pos) {
        match ch {
            b'&' | b' ' | b'\0' => return Ok(UrlDecode::Complete(written)),
            b'%' => {
                let avail = input.len() - *pos;
                if avail < 3 {
                    return Ok(UrlDecode::NeedMoreInput(3 - avail));
                }
                let hi = hex_to_int(input[*pos + 1]);
                let lo = hex_to_int(input[*pos + 2]);
                out.push((hi << 4) | lo)?;
                *pos += 3;
            }
            b'+' => {
                out.push(b' ')?;
                *pos += 1;
            }
            _ => {
                out.push(ch)?;
                *pos += 1;
            }
        }
        written += 1;
    }
    Ok(UrlDecode::Exhausted(written))
}
