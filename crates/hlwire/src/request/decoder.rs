//! HTTP request head decoder.
//!
//! Only the head is decoded: the request line and the headers up to the
//! blank line. The head must be complete before any of it is interpreted,
//! so a buffer that does not yet hold `\r\n\r\n` always reports
//! [`Progress::Incomplete`] and leaves the request untouched. The decoder
//! remembers how far it has already searched for the blank line, which keeps
//! repeated calls on a growing buffer linear.

use bstr::ByteSlice;

use super::{
    Method, Params, Request, RequestKind,
    query::{self, Reject},
};
use crate::error::{Progress, RequestError};

const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Bytes still missing from a terminator that may have started at the end of
/// `input`.
fn missing_terminator(input: &[u8]) -> usize {
    (1..TERMINATOR.len())
        .rev()
        .find(|&n| input.ends_with(&TERMINATOR[..n]))
        .map_or(TERMINATOR.len(), |n| TERMINATOR.len() - n)
}

/// Maps the path of the request target to an endpoint.
fn classify(path: &[u8]) -> Option<(RequestKind, Option<u32>)> {
    let rest = path.strip_prefix(b"/accounts/")?;
    let rest = rest.strip_suffix(b"/").unwrap_or(rest);
    let mut segments = rest.split_str(b"/");
    let endpoint = match (segments.next(), segments.next(), segments.next()) {
        (Some(b"filter"), None, _) => (RequestKind::Filter, None),
        (Some(b"group"), None, _) => (RequestKind::Group, None),
        (Some(b"new"), None, _) => (RequestKind::AccountsNew, None),
        (Some(b"likes"), None, _) => (RequestKind::AccountsLikes, None),
        (Some(id), None, _) => (RequestKind::AccountsUpdate, Some(query::parse_u32(id)?)),
        (Some(id), Some(b"recommend"), None) => {
            (RequestKind::Recommend, Some(query::parse_u32(id)?))
        }
        (Some(id), Some(b"suggest"), None) => (RequestKind::Suggest, Some(query::parse_u32(id)?)),
        _ => return None,
    };
    Some(endpoint)
}

fn reject(request: &mut Request, reason: &'static str) {
    tracing::debug!(reason, method = ?request.method, "invalid request");
    request.kind = RequestKind::Invalid;
    request.params = Params::None;
}

/// Decodes request heads into a reusable [`Request`].
///
/// One decoder serves one connection. Call [`reset`](Self::reset) before
/// feeding a new request unless the previous call returned
/// [`Progress::Complete`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDecoder {
    /// Offset below which the buffer is known not to contain the terminator.
    scanned: usize,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets any partially searched buffer.
    pub fn reset(&mut self) {
        self.scanned = 0;
    }

    /// Decodes the head at the start of `input`.
    ///
    /// `input` must begin with the request line and, across calls that
    /// returned [`Progress::Incomplete`], only ever grow at the end. On
    /// [`Progress::Complete`] the consumed count points just past the blank
    /// line, where the body starts (see [`Request::body`]).
    ///
    /// An unrecognized endpoint or a malformed parameter value is not an
    /// error: the request decodes with [`RequestKind::Invalid`].
    pub fn decode(&mut self, input: &[u8], request: &mut Request) -> Result<Progress, RequestError> {
        let from = self.scanned.min(input.len());
        let Some(found) = input[from..].find(TERMINATOR) else {
            self.scanned = input.len().saturating_sub(TERMINATOR.len() - 1);
            return Ok(Progress::Incomplete(missing_terminator(input)));
        };
        self.scanned = 0;

        let head = &input[..from + found];
        let consumed = head.len() + TERMINATOR.len();

        request.reset();
        let (line, headers) = head.split_once_str(b"\r\n").unwrap_or((head, &b""[..]));
        Self::headers(headers, line.len() + 2, request)?;
        Self::request_line(line, request)?;

        tracing::trace!(kind = ?request.kind, consumed, "decoded request");
        Ok(Progress::Complete(consumed))
    }

    fn headers(headers: &[u8], mut offset: usize, request: &mut Request) -> Result<(), RequestError> {
        if headers.is_empty() {
            return Ok(());
        }
        for line in headers.split_str(b"\r\n") {
            // Lines without a colon carry nothing we read.
            let Some((name, value)) = line.split_once_str(b":") else {
                offset += line.len() + 2;
                continue;
            };
            if name.eq_ignore_ascii_case(b"content-length") {
                let length = query::parse_u32(value.trim_ascii()).ok_or(RequestError::InvalidContentLength {
                    offset: offset + name.len() + 1,
                })?;
                request.content_length = length as usize;
            }
            offset += line.len() + 2;
        }
        Ok(())
    }

    fn request_line(line: &[u8], request: &mut Request) -> Result<(), RequestError> {
        let mut parts = line.splitn_str(3, b" ");
        let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            reject(request, "malformed request line");
            return Ok(());
        };
        request.method = Method::from_token(method);
        if !version.starts_with(b"HTTP/") {
            reject(request, "unsupported protocol");
            return Ok(());
        }

        let (path, query) = target.split_once_str(b"?").unwrap_or((target, &b""[..]));
        let Some((kind, entity_id)) = classify(path) else {
            reject(request, "unknown endpoint");
            return Ok(());
        };
        if kind.expected_method() != Some(request.method) {
            reject(request, "method not allowed");
            return Ok(());
        }
        request.kind = kind;
        request.entity_id = entity_id;
        request.params = Params::for_kind(kind);

        for (key, value) in query::pairs(query) {
            if key == b"query_id" {
                match query::parse_u32(value) {
                    Some(id) => request.query_id = Some(id),
                    None => {
                        reject(request, "malformed query_id");
                        return Ok(());
                    }
                }
                continue;
            }

            let (params, arena) = (&mut request.params, &mut request.arena);
            let applied = match params {
                Params::Filter(filter) => query::filter(filter, key, value, arena),
                Params::Basic(basic) => query::basic(basic, key, value, arena),
                Params::None => Ok(false),
            };
            match applied {
                Ok(true) => {}
                Ok(false) => tracing::trace!(key = %key.as_bstr(), "skipping unknown parameter"),
                Err(Reject::Value) => {
                    reject(request, "malformed parameter value");
                    return Ok(());
                }
                Err(Reject::Arena(err)) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_terminator_counts_partial_match() {
        assert_eq!(missing_terminator(b""), 4);
        assert_eq!(missing_terminator(b"GET"), 4);
        assert_eq!(missing_terminator(b"GET\r"), 3);
        assert_eq!(missing_terminator(b"GET\r\n"), 2);
        assert_eq!(missing_terminator(b"GET\r\n\r"), 1);
    }

    #[test]
    fn classify_paths() {
        assert_eq!(classify(b"/accounts/filter/"), Some((RequestKind::Filter, None)));
        assert_eq!(classify(b"/accounts/group"), Some((RequestKind::Group, None)));
        assert_eq!(classify(b"/accounts/new/"), Some((RequestKind::AccountsNew, None)));
        assert_eq!(classify(b"/accounts/likes/"), Some((RequestKind::AccountsLikes, None)));
        assert_eq!(classify(b"/accounts/17/"), Some((RequestKind::AccountsUpdate, Some(17))));
        assert_eq!(
            classify(b"/accounts/17/recommend/"),
            Some((RequestKind::Recommend, Some(17)))
        );
        assert_eq!(classify(b"/accounts/3/suggest"), Some((RequestKind::Suggest, Some(3))));

        assert_eq!(classify(b"/accounts/"), None);
        assert_eq!(classify(b"/accounts//"), None);
        assert_eq!(classify(b"/accounts/17/filter/"), None);
        assert_eq!(classify(b"/accounts/x1/suggest/"), None);
        assert_eq!(classify(b"/accounts/1/suggest/more/"), None);
        assert_eq!(classify(b"/accounts/99999999999/"), None);
        assert_eq!(classify(b"/users/filter/"), None);
    }
}
