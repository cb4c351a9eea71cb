//! Semantic version and version range types.
//!
//! Versions are plain `major.minor.patch` triples. Ranges are parsed from a
//! shorthand expression (caret, tilde, wildcard or explicit comparison) into a
//! canonical pair of bounds: `low` is always a `>`/`>=` bound and `high` is
//! always a `<`/`<=` bound, so membership is two comparisons.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{SpnError, SpnResult};

/// Semantic version (major.minor.patch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// A parsed version together with how many components the text spelled out.
///
/// `"1"` and `"1.0.0"` produce the same `Version`, but caret, tilde and
/// wildcard ranges widen differently depending on which components were given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedVersion {
    pub version: Version,
    pub components: u8,
}

/// Comparison operator of a single range bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Exact,     // ==1.0.0
}

/// Shorthand a range was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Caret,
    Tilde,
    Wildcard,
    Comparison,
}

/// One side of a range: a version and the operator applied against it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bound {
    pub version: Version,
    pub op: Op,
}

/// Canonical `{low, high}` version range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub low: Bound,
    pub high: Bound,
    pub modifier: Modifier,
    /// The literal expression, kept for conflict reports.
    text: String,
}

impl Version {
    pub const MIN: Version = Version::new(0, 0, 0);
    pub const MAX: Version = Version::new(u64::MAX, u64::MAX, u64::MAX);

    /// Create a new version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse dotted text, defaulting absent trailing components to zero
    pub fn parse(text: &str) -> SpnResult<Self> {
        parse_version(text).map(|parsed| parsed.version)
    }

    fn next_major(&self) -> Self {
        Self::new(self.major.saturating_add(1), 0, 0)
    }

    fn next_minor(&self) -> Self {
        Self::new(self.major, self.minor.saturating_add(1), 0)
    }

    fn next_patch(&self) -> Self {
        Self::new(self.major, self.minor, self.patch.saturating_add(1))
    }
}

/// Parse `major[.minor[.patch]]`.
///
/// Missing components default to zero; anything that is not a decimal
/// component is a parse error.
pub fn parse_version(text: &str) -> SpnResult<ParsedVersion> {
    let input = text.trim();
    if input.is_empty() {
        return Err(version_error(text, "empty version"));
    }

    let mut parts = [0u64; 3];
    let mut components = 0u8;
    for part in input.split('.') {
        if components == 3 {
            return Err(version_error(text, "more than three components"));
        }
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(version_error(text, &format!("'{}' is not a number", part)));
        }
        parts[components as usize] = part
            .parse()
            .map_err(|_| version_error(text, &format!("'{}' is out of range", part)))?;
        components += 1;
    }

    Ok(ParsedVersion {
        version: Version::new(parts[0], parts[1], parts[2]),
        components,
    })
}

/// Apply `op` to `version` against `bound`
pub fn satisfies(version: &Version, bound: &Version, op: Op) -> bool {
    match op {
        Op::Less => version < bound,
        Op::LessEq => version <= bound,
        Op::Greater => version > bound,
        Op::GreaterEq => version >= bound,
        Op::Exact => version == bound,
    }
}

/// Three-way lexicographic comparison, used to sort known versions ascending
pub fn compare(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch))
}

fn version_error(input: &str, reason: &str) -> SpnError {
    SpnError::VersionParse {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

fn range_error(input: &str, reason: &str) -> SpnError {
    SpnError::RangeParse {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

impl FromStr for Version {
    type Err = SpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = SpnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl Bound {
    pub fn new(version: Version, op: Op) -> Self {
        Self { version, op }
    }

    /// Check a version against this bound
    pub fn admits(&self, version: &Version) -> bool {
        satisfies(version, &self.version, self.op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Exact => "==",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

impl VersionRange {
    /// Parse a range expression.
    ///
    /// Dispatches on the first significant character: `^` caret, `~` tilde,
    /// `*` wildcard, `>`/`<`/`=` comparison, and a bare digit is a caret range
    /// unless the text continues into a `.*` wildcard.
    pub fn parse(text: &str) -> SpnResult<Self> {
        let input = text.trim();
        let first = input
            .chars()
            .next()
            .ok_or_else(|| range_error(text, "empty range"))?;

        match first {
            '^' => Ok(Self::caret(input, parse_range_version(text, &input[1..])?)),
            '~' => Ok(Self::tilde(input, parse_range_version(text, &input[1..])?)),
            '*' => Self::wildcard(input),
            '>' | '<' | '=' => Self::comparison(input),
            c if c.is_ascii_digit() => {
                if input.contains('*') {
                    Self::wildcard(input)
                } else {
                    Ok(Self::caret(input, parse_range_version(text, input)?))
                }
            },
            other => Err(range_error(
                text,
                &format!("unexpected leading character '{}'", other),
            )),
        }
    }

    /// Range matching exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            low: Bound::new(version, Op::GreaterEq),
            high: Bound::new(version, Op::LessEq),
            modifier: Modifier::Comparison,
            text: format!("=={}", version),
        }
    }

    /// Range matching every version
    pub fn any() -> Self {
        Self {
            low: Bound::new(Version::MIN, Op::GreaterEq),
            high: Bound::new(Version::MAX, Op::LessEq),
            modifier: Modifier::Wildcard,
            text: "*".to_string(),
        }
    }

    /// Check whether a version lies inside both bounds
    pub fn contains(&self, version: &Version) -> bool {
        self.low.admits(version) && self.high.admits(version)
    }

    /// The expression this range was parsed from
    pub fn text(&self) -> &str {
        &self.text
    }

    fn caret(text: &str, parsed: ParsedVersion) -> Self {
        let v = parsed.version;
        let upper = if v.major > 0 {
            v.next_major()
        } else if v.minor > 0 {
            v.next_minor()
        } else {
            v.next_patch()
        };
        Self::bounded(text, v, upper, Modifier::Caret)
    }

    fn tilde(text: &str, parsed: ParsedVersion) -> Self {
        let v = parsed.version;
        let upper = if parsed.components >= 2 {
            v.next_minor()
        } else {
            v.next_major()
        };
        Self::bounded(text, v, upper, Modifier::Tilde)
    }

    fn wildcard(text: &str) -> SpnResult<Self> {
        let mut concrete = [0u64; 2];
        let mut given = 0usize;
        let mut seen_star = false;

        for part in text.split('.') {
            if part == "*" {
                seen_star = true;
                continue;
            }
            if seen_star {
                return Err(range_error(text, "concrete component after '*'"));
            }
            if given == 2 {
                return Err(range_error(text, "wildcard must replace the patch component"));
            }
            concrete[given] = parse_range_version(text, part)?.version.major;
            given += 1;
        }
        if !seen_star {
            return Err(range_error(text, "expected '*'"));
        }

        let low = Version::new(concrete[0], concrete[1], 0);
        let range = match given {
            0 => Self {
                low: Bound::new(Version::MIN, Op::GreaterEq),
                high: Bound::new(Version::MAX, Op::LessEq),
                modifier: Modifier::Wildcard,
                text: text.to_string(),
            },
            1 => Self::bounded(text, low, low.next_major(), Modifier::Wildcard),
            _ => Self::bounded(text, low, low.next_minor(), Modifier::Wildcard),
        };
        Ok(range)
    }

    fn comparison(text: &str) -> SpnResult<Self> {
        let (op, rest) = if let Some(rest) = text.strip_prefix(">=") {
            (Op::GreaterEq, rest)
        } else if let Some(rest) = text.strip_prefix('>') {
            (Op::Greater, rest)
        } else if let Some(rest) = text.strip_prefix("<=") {
            (Op::LessEq, rest)
        } else if let Some(rest) = text.strip_prefix('<') {
            (Op::Less, rest)
        } else if let Some(rest) = text.strip_prefix("==") {
            (Op::Exact, rest)
        } else if let Some(rest) = text.strip_prefix('=') {
            (Op::Exact, rest)
        } else {
            return Err(range_error(text, "expected a comparison operator"));
        };

        let v = parse_range_version(text, rest)?.version;
        let (low, high) = match op {
            Op::Exact => (Bound::new(v, Op::GreaterEq), Bound::new(v, Op::LessEq)),
            Op::Greater | Op::GreaterEq => (Bound::new(v, op), Bound::new(Version::MAX, Op::LessEq)),
            Op::Less | Op::LessEq => (Bound::new(Version::MIN, Op::GreaterEq), Bound::new(v, op)),
        };

        Ok(Self {
            low,
            high,
            modifier: Modifier::Comparison,
            text: text.to_string(),
        })
    }

    fn bounded(text: &str, low: Version, high: Version, modifier: Modifier) -> Self {
        Self {
            low: Bound::new(low, Op::GreaterEq),
            high: Bound::new(high, Op::Less),
            modifier,
            text: text.to_string(),
        }
    }
}

/// Version parse inside a range, reported against the whole range text
fn parse_range_version(range: &str, text: &str) -> SpnResult<ParsedVersion> {
    parse_version(text).map_err(|e| match e {
        SpnError::VersionParse { reason, .. } => range_error(range, &reason),
        other => other,
    })
}

impl FromStr for VersionRange {
    type Err = SpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
