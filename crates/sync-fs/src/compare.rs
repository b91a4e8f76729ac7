//! Escape-aware, codepoint-level comparison of names and paths.
//!
//! Both operands are walked one unit at a time. A unit is either a UTF-8
//! codepoint or, where a `%xx` escape token is recognised, the raw byte it
//! encodes. Which tokens are recognised depends on the side:
//!
//! - local names decode every well-formed token;
//! - remote names decode a token only when it encodes a control byte, since
//!   a remote `%` that is not control-encoding is a literal character.
//!
//! An optional [`Transform`] folds each unit before comparison.

use std::cmp::Ordering;

use crate::fstype::{FileSystemType, is_control};

/// Per-codepoint transform applied before units are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    /// Locale-independent simple uppercase mapping.
    UpperCase,
}

impl Transform {
    /// Transform matching the case rule of `fs_type`.
    pub fn for_fs(fs_type: FileSystemType) -> Self {
        if fs_type.is_case_insensitive() {
            Self::UpperCase
        } else {
            Self::Identity
        }
    }

    pub fn apply(self, codepoint: u32) -> u32 {
        match self {
            Self::Identity => codepoint,
            Self::UpperCase => to_upper(codepoint),
        }
    }
}

fn to_upper(codepoint: u32) -> u32 {
    let Some(ch) = char::from_u32(codepoint) else {
        return codepoint;
    };

    // Only single-codepoint mappings; expansions such as 'ß' -> "SS" keep
    // the original so each unit still maps to exactly one unit.
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(mapped), None) => mapped as u32,
        _ => codepoint,
    }
}

fn is_lc_hex(byte: u8) -> bool {
    byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte)
}

fn hex_val(byte: u8) -> u8 {
    if byte.is_ascii_digit() {
        byte - b'0'
    } else {
        byte - b'a' + 10
    }
}

/// Whether `s` starts with a `%` followed by two lowercase hex digits.
pub fn is_escape(s: &[u8]) -> bool {
    matches!(s, [b'%', hi, lo, ..] if is_lc_hex(*hi) && is_lc_hex(*lo))
}

/// Decode the escape token at the start of `s`.
pub fn decode_escape(s: &[u8]) -> Option<u8> {
    if !is_escape(s) {
        return None;
    }
    Some(hex_val(s[1]) << 4 | hex_val(s[2]))
}

/// Whether `s` starts with an escape token encoding a control byte.
pub fn is_control_escape(s: &[u8]) -> bool {
    decode_escape(s).is_some_and(is_control)
}

/// Length of the UTF-8 sequence introduced by `lead`.
///
/// Continuation and invalid lead bytes count as a sequence of one.
pub(crate) fn utf8_sequence_size(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy)]
enum EscapePolicy {
    Any,
    ControlOnly,
}

/// Iterator over the comparison units of a byte string.
struct Units<'a> {
    rest: &'a [u8],
    policy: EscapePolicy,
}

impl<'a> Units<'a> {
    fn new(bytes: &'a [u8], policy: EscapePolicy) -> Self {
        Self {
            rest: bytes,
            policy,
        }
    }
}

impl Iterator for Units<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.rest.is_empty() {
            return None;
        }

        let escaped = match self.policy {
            EscapePolicy::Any => decode_escape(self.rest),
            EscapePolicy::ControlOnly => decode_escape(self.rest).filter(|b| is_control(*b)),
        };

        if let Some(byte) = escaped {
            self.rest = &self.rest[3..];
            return Some(u32::from(byte));
        }

        let width = utf8_sequence_size(self.rest[0]).min(self.rest.len());
        let unit = match std::str::from_utf8(&self.rest[..width]) {
            Ok(s) => s.chars().next().map(|c| (c as u32, width)),
            Err(_) => None,
        };

        // Malformed UTF-8 yields its lead byte as a unit of its own.
        let (codepoint, consumed) = unit.unwrap_or((u32::from(self.rest[0]), 1));
        self.rest = &self.rest[consumed..];
        Some(codepoint)
    }
}

fn compare_units(mut lhs: Units<'_>, mut rhs: Units<'_>, transform: Transform) -> Ordering {
    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => {
                let (a, b) = (transform.apply(a), transform.apply(b));
                if a != b {
                    return a.cmp(&b);
                }
            }
        }
    }
}

/// Compare two local names, decoding every escape token on both sides.
pub fn local_compare(lhs: &[u8], rhs: &[u8], transform: Transform) -> Ordering {
    compare_units(
        Units::new(lhs, EscapePolicy::Any),
        Units::new(rhs, EscapePolicy::Any),
        transform,
    )
}

/// Compare a local name against a remote name.
///
/// The local side decodes every escape token; the remote side only decodes
/// tokens encoding control bytes. This asymmetry must stay: local names
/// always escape their own `%`, remote names never do.
pub fn remote_compare(local: &[u8], remote: &[u8], transform: Transform) -> Ordering {
    compare_units(
        Units::new(local, EscapePolicy::Any),
        Units::new(remote, EscapePolicy::ControlOnly),
        transform,
    )
}

/// Ordering of remote names under the case rule of a filesystem type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteNameOrder {
    fs_type: FileSystemType,
}

impl RemoteNameOrder {
    pub fn new(fs_type: FileSystemType) -> Self {
        Self { fs_type }
    }

    pub fn fs_type(&self) -> FileSystemType {
        self.fs_type
    }

    pub fn compare(&self, lhs: &[u8], rhs: &[u8]) -> Ordering {
        remote_compare(lhs, rhs, Transform::for_fs(self.fs_type))
    }

    /// Sort `names` in place, stable for names comparing equal.
    pub fn sort<T: AsRef<[u8]>>(&self, names: &mut [T]) {
        names.sort_by(|a, b| self.compare(a.as_ref(), b.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_shape_is_exact() {
        assert!(is_escape(b"%2e"));
        assert!(is_escape(b"%ffrest"));
        assert!(!is_escape(b"%2E"));
        assert!(!is_escape(b"%2"));
        assert!(!is_escape(b"%g0"));
        assert!(!is_escape(b"x%20"));
        assert_eq!(decode_escape(b"%41"), Some(b'A'));
        assert_eq!(decode_escape(b"%4"), None);
    }

    #[test]
    fn control_escape_detection() {
        assert!(is_control_escape(b"%00"));
        assert!(is_control_escape(b"%1f"));
        assert!(is_control_escape(b"%7f"));
        assert!(!is_control_escape(b"%20"));
        assert!(!is_control_escape(b"%25"));
    }

    #[test]
    fn case_fold_decodes_escapes() {
        assert_eq!(local_compare(b"%41BC", b"abc", Transform::UpperCase), Ordering::Equal);
        assert_ne!(local_compare(b"%41BC", b"abc", Transform::Identity), Ordering::Equal);
    }

    #[test]
    fn remote_percent_stays_literal() {
        assert_eq!(remote_compare(b"a%25b", b"a%b", Transform::Identity), Ordering::Equal);
        // A remote non-control token is three literal characters.
        assert_ne!(remote_compare(b"a%25b", b"a%25b", Transform::Identity), Ordering::Equal);
        // ...but a control token is decoded on both sides.
        assert_eq!(remote_compare(b"a%01", b"a%01", Transform::Identity), Ordering::Equal);
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        assert_eq!(local_compare(b"abc", b"abcd", Transform::Identity), Ordering::Less);
        assert_eq!(local_compare(b"abcd", b"abc", Transform::Identity), Ordering::Greater);
        assert_eq!(local_compare(b"", b"", Transform::Identity), Ordering::Equal);
    }

    #[test]
    fn multibyte_units_compare_by_codepoint() {
        // U+00E9 sorts after 'z', and an escaped raw byte compares as that byte.
        assert_eq!(local_compare("é".as_bytes(), b"z", Transform::Identity), Ordering::Greater);
        assert_eq!(
            local_compare("É".as_bytes(), "é".as_bytes(), Transform::UpperCase),
            Ordering::Equal
        );
        assert_eq!(local_compare(b"%e9", "é".as_bytes(), Transform::Identity), Ordering::Equal);
    }

    #[test]
    fn remote_order_sorts_case_insensitively_on_ntfs() {
        let order = RemoteNameOrder::new(FileSystemType::Ntfs);
        let mut names = vec!["b", "A", "a", "C"];
        order.sort(&mut names);
        assert_eq!(names, ["A", "a", "b", "C"]);

        let order = RemoteNameOrder::new(FileSystemType::Ext);
        let mut names = vec!["b", "A", "a", "C"];
        order.sort(&mut names);
        assert_eq!(names, ["A", "C", "a", "b"]);
    }
}
