// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request payload decoding.
//!
//! TLSRPT reporters may send `application/tlsrpt+gzip` bodies. Decompression
//! failures are never fatal here: the raw bytes are handed on and the report
//! parser gets to decide whether they make sense.
//!
//! Decompressed output is capped at the same size as the request body limit.
//! A stream that inflates past the cap counts as a decompression failure.

use flate2::read::{MultiGzDecoder, ZlibDecoder};
use std::borrow::Cow;
use std::io::{self, Read};
use tracing::{debug, warn};

/// Whether a `Content-Type` header value announces a compressed body.
pub fn is_compressed(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.trim_end().ends_with("gzip"))
}

/// Decode a request body, decompressing it when flagged.
///
/// Gzip is tried first, then a zlib stream. If neither succeeds within
/// `limit` decoded bytes the input is returned unchanged.
pub fn decode_payload(body: &[u8], compressed: bool, limit: usize) -> Cow<'_, [u8]> {
    if !compressed {
        return Cow::Borrowed(body);
    }

    match inflate(body, limit) {
        Ok(decoded) => {
            debug!(
                compressed_len = body.len(),
                decoded_len = decoded.len(),
                "Decompressed report payload"
            );
            Cow::Owned(decoded)
        }
        Err(err) => {
            warn!(error = %err, len = body.len(), "Failed to decompress payload, using raw bytes");
            Cow::Borrowed(body)
        }
    }
}

/// Decode bytes to text, replacing invalid UTF-8 sequences.
pub fn to_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn inflate(body: &[u8], limit: usize) -> io::Result<Vec<u8>> {
    read_bounded(MultiGzDecoder::new(body), limit)
        .or_else(|gz_err| read_bounded(ZlibDecoder::new(body), limit).map_err(|_| gz_err))
}

fn read_bounded(reader: impl Read, limit: usize) -> io::Result<Vec<u8>> {
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut out = Vec::new();
    reader.take(cap).read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed payload exceeds {limit} bytes"),
        ));
    }
    Ok(out)
}
