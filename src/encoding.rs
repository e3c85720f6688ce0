use std::fmt;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// How the encoding decision was reached, surfaced in `detect` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Bom,
    ValidUtf8,
    Detector,
    Fallback,
}

impl fmt::Display for EncodingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EncodingSource::Bom => "bom",
            EncodingSource::ValidUtf8 => "valid-utf8",
            EncodingSource::Detector => "detector",
            EncodingSource::Fallback => "fallback",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,
    /// Canonical lower-case label carried by documents. Distinguishes
    /// "utf-8-sig" (UTF-8 with BOM) from plain "utf-8".
    pub name: String,
    pub source: EncodingSource,
}

/// Decide the encoding for raw bytes. Total: always returns a concrete
/// encoding, falling back to UTF-8 when nothing better can be justified.
///
/// Order of precedence: BOM, then strict UTF-8 validation (which also
/// normalizes plain ASCII to "utf-8"), then the statistical detector when
/// its guess is assessed as reliable, then the UTF-8 fallback.
pub fn detect(bytes: &[u8]) -> DetectedEncoding {
    if let Some(detected) = detect_bom(bytes) {
        return detected;
    }

    if std::str::from_utf8(bytes).is_ok() {
        return DetectedEncoding {
            encoding: UTF_8,
            name: "utf-8".to_string(),
            source: EncodingSource::ValidUtf8,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (guess, reliable) = detector.guess_assess(None, true);
    if reliable {
        return DetectedEncoding {
            encoding: guess,
            name: guess.name().to_ascii_lowercase(),
            source: EncodingSource::Detector,
        };
    }

    DetectedEncoding {
        encoding: UTF_8,
        name: "utf-8".to_string(),
        source: EncodingSource::Fallback,
    }
}

fn detect_bom(bytes: &[u8]) -> Option<DetectedEncoding> {
    if bytes.starts_with(&UTF8_BOM) {
        return Some(DetectedEncoding {
            encoding: UTF_8,
            name: "utf-8-sig".to_string(),
            source: EncodingSource::Bom,
        });
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Some(DetectedEncoding {
            encoding: UTF_16LE,
            name: "utf-16le".to_string(),
            source: EncodingSource::Bom,
        });
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Some(DetectedEncoding {
            encoding: UTF_16BE,
            name: "utf-16be".to_string(),
            source: EncodingSource::Bom,
        });
    }

    None
}

/// Decode with the detected encoding, replacing malformed sequences with
/// U+FFFD instead of failing. BOMs are consumed by the decoder and never
/// appear in the returned text.
pub fn decode_lossy(bytes: &[u8]) -> (String, DetectedEncoding, bool) {
    let detected = detect(bytes);
    let (text, _, had_errors) = detected.encoding.decode(bytes);
    (text.into_owned(), detected, had_errors)
}

/// Resolve a stored label back to a concrete encoding for writing. The
/// second value says whether a UTF-8 BOM must be prepended. Labels the
/// encoding table does not know fall back to UTF-8.
pub fn resolve_label(name: &str) -> (&'static Encoding, bool) {
    let trimmed = name.trim();
    if trimmed.eq_ignore_ascii_case("utf-8-sig") {
        return (UTF_8, true);
    }
    match Encoding::for_label(trimmed.as_bytes()) {
        Some(encoding) => (encoding, false),
        None => (UTF_8, false),
    }
}

/// Encode text for persistence under a stored label. Characters the target
/// encoding cannot represent are replaced by the encoder, not fatal.
///
/// UTF-16 is encoded by hand (with its BOM, so the file stays detectable);
/// encoding_rs encoders deliberately emit UTF-8 for the UTF-16 encodings.
pub fn encode_for(text: &str, name: &str) -> Vec<u8> {
    let (encoding, write_bom) = resolve_label(name);
    if encoding == UTF_16LE {
        return encode_utf16(text, false);
    }
    if encoding == UTF_16BE {
        return encode_utf16(text, true);
    }
    let (encoded, _, _) = encoding.encode(text);
    if write_bom {
        let mut bytes = Vec::with_capacity(UTF8_BOM.len() + encoded.len());
        bytes.extend_from_slice(&UTF8_BOM);
        bytes.extend_from_slice(encoded.as_ref());
        bytes
    } else {
        encoded.into_owned()
    }
}

fn encode_utf16(text: &str, big_endian: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(if big_endian { &[0xFE, 0xFF] } else { &[0xFF, 0xFE] });
    for unit in text.encode_utf16() {
        let pair = if big_endian {
            unit.to_be_bytes()
        } else {
            unit.to_le_bytes()
        };
        bytes.extend_from_slice(&pair);
    }
    bytes
}
