//! Object identity codec
//!
//! External callers never see storage keys directly. Every stored object is
//! addressed by a URN: the platform object id
//! (`urn:adsk.objects:os.object:<bucket>/<key>`) encoded as unpadded base64.
//! The URL-safe alphabet is used when encoding so URNs fit in a path segment;
//! decoding accepts either alphabet, padded or not.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt;
use thiserror::Error;

const OBJECT_ID_PREFIX: &str = "urn:adsk.objects:os.object:";

const DECODE_CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, DECODE_CONFIG);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, DECODE_CONFIG);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrnError {
    #[error("identifier '{0}' is not valid base64")]
    NotBase64(String),

    #[error("identifier '{0}' does not decode to UTF-8 text")]
    NotUtf8(String),

    #[error("identifier is empty")]
    Empty,
}

/// Opaque, externally visible object identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn(String);

impl Urn {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode an identifier as a URN
pub fn encode(id: &str) -> Urn {
    Urn(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(id.as_bytes()))
}

/// Decode a URN back to the identifier it was produced from
pub fn decode(urn: &str) -> Result<String, UrnError> {
    let trimmed = urn.trim();
    if trimmed.is_empty() {
        return Err(UrnError::Empty);
    }

    let bytes = URL_SAFE_LENIENT
        .decode(trimmed)
        .or_else(|_| STANDARD_LENIENT.decode(trimmed))
        .map_err(|_| UrnError::NotBase64(urn.to_string()))?;

    String::from_utf8(bytes).map_err(|_| UrnError::NotUtf8(urn.to_string()))
}

/// Platform object id: a bucket plus an object key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectId {
    pub bucket: String,
    pub key: String,
}

impl ObjectId {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a decoded URN.
    ///
    /// Full object ids carry their bucket. Anything else is taken as a bare
    /// key living in `default_bucket`.
    pub fn parse(decoded: &str, default_bucket: &str) -> Self {
        if let Some(rest) = decoded.strip_prefix(OBJECT_ID_PREFIX) {
            if let Some((bucket, key)) = rest.split_once('/') {
                if !bucket.is_empty() && !key.is_empty() {
                    return Self::new(bucket, key);
                }
            }
        }
        Self::new(default_bucket, decoded)
    }

    pub fn to_urn(&self) -> Urn {
        encode(&self.to_string())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", OBJECT_ID_PREFIX, self.bucket, self.key)
    }
}
