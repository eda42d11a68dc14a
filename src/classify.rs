//! Hash classification: maps a hash-like string to a digest tag.
//!
//! Rules are applied in priority order: `$<id>$` prefixed formats first, then
//! exact hex length, then hex-only shapes, then base64 padding. The result is a
//! heuristic guess; a confirmed crack is authoritative over it.
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

/// Numeric-id families of the `crypt(3)` modular format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptFamily {
    /// `$1$`
    Md5Crypt,
    /// `$5$`
    Sha256Crypt,
    /// `$6$`
    Sha512Crypt,
}

/// Classification label for a hash string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestTag {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Bcrypt,
    Crypt(CryptFamily),
    HalfMd5,
    Base64,
    Unknown,
}

/// Hex lengths of the digests the engine can compute. Exact match only.
const HEX_LENGTHS: [(usize, DigestTag); 4] = [
    (32, DigestTag::Md5),
    (40, DigestTag::Sha1),
    (64, DigestTag::Sha256),
    (128, DigestTag::Sha512),
];

const HALF_MD5_LEN: usize = 16;
const LONG_HEX_LEN: usize = 24;

impl DigestTag {
    /// True for the four digests the crack engine computes.
    pub fn is_actionable(self) -> bool {
        matches!(
            self,
            DigestTag::Md5 | DigestTag::Sha1 | DigestTag::Sha256 | DigestTag::Sha512
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestTag::Md5 => "md5",
            DigestTag::Sha1 => "sha1",
            DigestTag::Sha256 => "sha256",
            DigestTag::Sha512 => "sha512",
            DigestTag::Bcrypt => "bcrypt",
            DigestTag::Crypt(CryptFamily::Md5Crypt) => "md5-crypt",
            DigestTag::Crypt(CryptFamily::Sha256Crypt) => "sha256-crypt",
            DigestTag::Crypt(CryptFamily::Sha512Crypt) => "sha512-crypt",
            DigestTag::HalfMd5 => "md5-half",
            DigestTag::Base64 => "base64",
            DigestTag::Unknown => "unknown",
        }
    }

    /// Lowercase hex digest of `candidate` followed by `salt`. Returns `None`
    /// for tags that are not actionable.
    pub fn hex_digest(self, candidate: &str, salt: &str) -> Option<String> {
        let digest = match self {
            DigestTag::Md5 => salted::<Md5>(candidate, salt),
            DigestTag::Sha1 => salted::<Sha1>(candidate, salt),
            DigestTag::Sha256 => salted::<Sha256>(candidate, salt),
            DigestTag::Sha512 => salted::<Sha512>(candidate, salt),
            _ => return None,
        };
        Some(hex::encode(digest))
    }

    /// Decode `target` once for repeated comparisons. `None` when the tag is
    /// not actionable or `target` is not valid hex.
    pub fn matcher(self, target: &str) -> Option<DigestMatcher> {
        if !self.is_actionable() {
            return None;
        }
        let target = hex::decode(target).ok()?;
        Some(DigestMatcher { tag: self, target })
    }

    /// Compare the digest of `candidate + salt` against `target`, ignoring
    /// hex case.
    pub fn matches(self, candidate: &str, salt: &str, target: &str) -> bool {
        self.matcher(target)
            .is_some_and(|m| m.matches(candidate, salt))
    }
}

/// A decoded target digest, tested against candidates without re-encoding.
#[derive(Debug, Clone)]
pub struct DigestMatcher {
    tag: DigestTag,
    target: Vec<u8>,
}

impl DigestMatcher {
    pub fn tag(&self) -> DigestTag {
        self.tag
    }

    pub fn matches(&self, candidate: &str, salt: &str) -> bool {
        match self.tag {
            DigestTag::Md5 => salted_eq::<Md5>(candidate, salt, &self.target),
            DigestTag::Sha1 => salted_eq::<Sha1>(candidate, salt, &self.target),
            DigestTag::Sha256 => salted_eq::<Sha256>(candidate, salt, &self.target),
            DigestTag::Sha512 => salted_eq::<Sha512>(candidate, salt, &self.target),
            _ => false,
        }
    }
}

impl fmt::Display for DigestTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn salted<D: Digest>(candidate: &str, salt: &str) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(candidate.as_bytes());
    if !salt.is_empty() {
        hasher.update(salt.as_bytes());
    }
    hasher.finalize().to_vec()
}

fn salted_eq<D: Digest>(candidate: &str, salt: &str, target: &[u8]) -> bool {
    if target.len() != <D as Digest>::output_size() {
        return false;
    }
    let mut hasher = D::new();
    hasher.update(candidate.as_bytes());
    if !salt.is_empty() {
        hasher.update(salt.as_bytes());
    }
    hasher.finalize().as_slice() == target
}

fn classify_prefix(lower: &str) -> Option<DigestTag> {
    let rest = lower.strip_prefix('$')?;
    // `$id` alone is not a prefixed format; a second marker must follow.
    let (id, _payload) = rest.split_once('$')?;
    let tag = match id {
        "2a" | "2b" | "2y" => DigestTag::Bcrypt,
        "1" => DigestTag::Crypt(CryptFamily::Md5Crypt),
        "5" => DigestTag::Crypt(CryptFamily::Sha256Crypt),
        "6" => DigestTag::Crypt(CryptFamily::Sha512Crypt),
        "md5" => DigestTag::Md5,
        "sha1" => DigestTag::Sha1,
        "sha256" => DigestTag::Sha256,
        "sha512" => DigestTag::Sha512,
        _ => return None,
    };
    Some(tag)
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Classify a hash string. Pure: depends only on the string itself.
pub fn classify(hash: &str) -> DigestTag {
    let lower = hash.to_lowercase();

    if let Some(tag) = classify_prefix(&lower) {
        return tag;
    }

    let len = lower.chars().count();
    if let Some((_, tag)) = HEX_LENGTHS.iter().find(|(l, _)| *l == len) {
        return *tag;
    }

    if is_hex(&lower) {
        if len == HALF_MD5_LEN {
            return DigestTag::HalfMd5;
        }
        if len > LONG_HEX_LEN {
            return DigestTag::Unknown;
        }
    } else if lower.ends_with('=') && STANDARD.decode(lower.as_bytes()).is_ok() {
        return DigestTag::Base64;
    }

    DigestTag::Unknown
}
