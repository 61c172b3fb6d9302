//! `multipart/x-protobuf` response decoding
//!
//! Doppler answers with one binary part per envelope:
//!
//! ```text
//! --boundary\r\n
//! \r\n
//! <envelope bytes>\r\n
//! --boundary--\r\n
//! ```
//!
//! Parts may carry headers; they are skipped.

use crate::error::{ClientError, Result};
use bytes::Bytes;
use prost::Message;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Extracts the boundary parameter of a `multipart/*` content type
pub fn boundary(content_type: &str) -> Result<String> {
    let parsed: mime::Mime = content_type
        .parse()
        .map_err(|_| invalid_content_type(content_type))?;
    if parsed.type_() != mime::MULTIPART {
        return Err(invalid_content_type(content_type));
    }
    parsed
        .get_param(mime::BOUNDARY)
        .map(|boundary| boundary.as_str().to_string())
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| invalid_content_type(content_type))
}

fn invalid_content_type(content_type: &str) -> ClientError {
    ClientError::Multipart(format!(
        "Content-Type {content_type} does not contain a valid multipart boundary"
    ))
}

/// Splits a multipart body into the bodies of its parts
pub fn split_parts(body: &Bytes, boundary: &str) -> Result<Vec<Bytes>> {
    let delimiter = format!("--{boundary}").into_bytes();

    let Some(first) = find(body, &delimiter, 0) else {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        return Err(ClientError::Multipart("missing opening boundary".into()));
    };

    let mut parts = Vec::new();
    let mut position = first + delimiter.len();
    loop {
        if body[position..].starts_with(b"--") {
            return Ok(parts);
        }
        if !body[position..].starts_with(CRLF) {
            return Err(ClientError::Multipart(
                "boundary is not followed by a line break".into(),
            ));
        }
        let start = position + CRLF.len();

        // A part ends at the CRLF preceding the next delimiter
        let closing = [CRLF, delimiter.as_slice()].concat();
        let Some(end) = find(body, &closing, start) else {
            return Err(ClientError::Multipart("missing closing boundary".into()));
        };

        parts.push(part_body(body.slice(start..end)));
        position = end + closing.len();
    }
}

/// Drops the header block of a part
fn part_body(part: Bytes) -> Bytes {
    if part.starts_with(CRLF) {
        return part.slice(CRLF.len()..);
    }
    match find(&part, HEADER_END, 0) {
        Some(index) => part.slice(index + HEADER_END.len()..),
        None => part,
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| from + index)
}

/// Decodes every part of a multipart body as a protobuf message
pub fn decode<M: Message + Default>(content_type: &str, body: &Bytes) -> Result<Vec<M>> {
    let boundary = boundary(content_type)?;
    split_parts(body, &boundary)?
        .into_iter()
        .map(|part| M::decode(part).map_err(ClientError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&[u8]], boundary: &str) -> Bytes {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{boundary}\r\n\r\n").as_bytes());
            body.extend_from_slice(part);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Bytes::from(body)
    }

    #[test]
    fn test_boundary() {
        assert_eq!(
            boundary("multipart/x-protobuf; boundary=90ad9060c87222ee30ddcffe751393a7c5734c48e070a623121abf82eb3c").unwrap(),
            "90ad9060c87222ee30ddcffe751393a7c5734c48e070a623121abf82eb3c"
        );
        assert!(matches!(
            boundary("application/json"),
            Err(ClientError::Multipart(_))
        ));
        assert!(boundary("multipart/x-protobuf").is_err());
    }

    #[test]
    fn test_split_parts() {
        let parts = split_parts(&body(&[b"first", b"second\r\nline"], "b0undary"), "b0undary").unwrap();
        assert_eq!(parts, [Bytes::from_static(b"first"), Bytes::from_static(b"second\r\nline")]);
    }

    #[test]
    fn test_part_headers_are_skipped() {
        let raw = Bytes::from_static(
            b"--xyz\r\nContent-Type: application/octet-stream\r\n\r\npayload\r\n--xyz--",
        );
        assert_eq!(split_parts(&raw, "xyz").unwrap(), [Bytes::from_static(b"payload")]);
    }

    #[test]
    fn test_empty_and_truncated_bodies() {
        assert!(split_parts(&Bytes::new(), "xyz").unwrap().is_empty());
        assert!(split_parts(&Bytes::from_static(b"--xyz--"), "xyz").unwrap().is_empty());
        assert!(matches!(
            split_parts(&Bytes::from_static(b"--xyz\r\n\r\npayload"), "xyz"),
            Err(ClientError::Multipart(_))
        ));
        assert!(split_parts(&Bytes::from_static(b"garbage"), "xyz").is_err());
    }
}
