//! Server version parsing for capability negotiation

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Minimum version bulk relocation is gated on; servers must be strictly newer.
pub const BULK_RELOCATION_FLOOR: [u64; 3] = [3, 2, 0];

/// A server version reduced to `(major, minor, patch)`.
///
/// Equality, ordering and hashing all look only at the digit tuple. An
/// unparsable version keeps its raw text but compares as `0.0.0`, which
/// makes it the oldest possible server.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    raw: String,
    valid: bool,
    digits: [u64; 3],
}

impl SemanticVersion {
    /// Parse `MAJOR.MINOR.PATCH` or `vMAJOR.MINOR.PATCH`, ignoring any suffix
    pub fn parse(raw: &str) -> Self {
        let digits = raw
            .strip_prefix('v')
            .and_then(parse_digits)
            .or_else(|| parse_digits(raw));
        Self {
            raw: raw.to_string(),
            valid: digits.is_some(),
            digits: digits.unwrap_or([0, 0, 0]),
        }
    }

    /// Build a valid version from its components
    pub fn from_digits(major: u64, minor: u64, patch: u64) -> Self {
        let digits = [major, minor, patch];
        Self {
            raw: format!("{}.{}.{}", major, minor, patch),
            valid: true,
            digits,
        }
    }

    /// The string this version was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the raw string matched a version pattern
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// `(major, minor, patch)`; `(0, 0, 0)` when invalid
    pub fn digits(&self) -> (u64, u64, u64) {
        let [major, minor, patch] = self.digits;
        (major, minor, patch)
    }

    /// Whether this server is strictly newer than [`BULK_RELOCATION_FLOOR`]
    pub fn supports_bulk_relocation(&self) -> bool {
        self.digits > BULK_RELOCATION_FLOOR
    }
}

/// Bulk relocation is used only when both servers support it
pub fn bulk_relocation_supported(source: &SemanticVersion, destination: &SemanticVersion) -> bool {
    source.supports_bulk_relocation() && destination.supports_bulk_relocation()
}

/// Three dot-separated runs of ASCII digits at the start of `s`
fn parse_digits(s: &str) -> Option<[u64; 3]> {
    let mut digits = [0u64; 3];
    let mut rest = s;
    for (i, slot) in digits.iter_mut().enumerate() {
        if i > 0 {
            rest = rest.strip_prefix('.')?;
        }
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return None;
        }
        *slot = rest[..len].parse().ok()?;
        rest = &rest[len..];
    }
    Some(digits)
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.digits == other.digits
    }
}

impl Eq for SemanticVersion {}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits.cmp(&other.digits)
    }
}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digits.hash(state);
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch] = self.digits;
        write!(f, "{}.{}.{}", major, minor, patch)
    }
}
