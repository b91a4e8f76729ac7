//! Name escaping between remote names and filesystem-safe local names.
//!
//! A local name stores every byte its filesystem cannot hold as a `%xx`
//! token (two lowercase hex digits). `%` itself and NUL are always escaped,
//! so any token found in a local name was produced by escaping.
//!
//! All functions are pure and operate on raw bytes: remote names may carry
//! bytes that are not valid UTF-8 once unescaped.

use crate::compare::{decode_escape, utf8_sequence_size};
use crate::fstype::{FileSystemType, is_control};

const DOT: &[u8] = b".";
const DOT_DOT: &[u8] = b"..";
const ESCAPED_DOT: &[u8] = b"%2e";
const ESCAPED_DOT_DOT: &[u8] = b"%2e%2e";

fn push_escaped(out: &mut Vec<u8>, byte: u8) {
    out.extend_from_slice(format!("%{byte:02x}").as_bytes());
}

/// Width of the valid UTF-8 sequence starting at `bytes[0]`, or 1.
fn valid_sequence_width(bytes: &[u8]) -> usize {
    let width = utf8_sequence_size(bytes[0]);
    if width > 1 && bytes.len() >= width && std::str::from_utf8(&bytes[..width]).is_ok() {
        width
    } else {
        1
    }
}

/// Escape every byte of `name` that `fs_type` cannot store.
///
/// `.` and `..` become `%2e` and `%2e%2e`. Tokens that already encode a
/// control byte are decoded first and then re-escaped only if the target
/// filesystem rejects that byte. Multi-byte UTF-8 sequences pass through.
pub fn escape(name: impl AsRef<[u8]>, fs_type: FileSystemType) -> Vec<u8> {
    let name = name.as_ref();

    if name == DOT_DOT {
        return ESCAPED_DOT_DOT.to_vec();
    }
    if name == DOT {
        return ESCAPED_DOT.to_vec();
    }

    let mut out = Vec::with_capacity(name.len());
    let mut i = 0;

    while i < name.len() {
        let rest = &name[i..];

        let (byte, consumed) = match decode_escape(rest) {
            Some(decoded) if is_control(decoded) => (decoded, 3),
            _ => (rest[0], valid_sequence_width(rest)),
        };

        if consumed > 1 && !is_control(byte) {
            out.extend_from_slice(&rest[..consumed]);
        } else if fs_type.is_compatible(byte) {
            out.push(byte);
        } else {
            push_escaped(&mut out, byte);
            tracing::debug!(fs_type = %fs_type, byte, "Escaped character for filesystem");
        }

        i += consumed;
    }

    out
}

/// Reverse [`escape`].
///
/// Raw control bytes are escaped, tokens encoding control bytes stay
/// encoded, and every other token is replaced by the byte it encodes.
pub fn unescape(name: impl AsRef<[u8]>) -> Vec<u8> {
    let name = name.as_ref();

    if name == ESCAPED_DOT_DOT {
        return DOT_DOT.to_vec();
    }
    if name == ESCAPED_DOT {
        return DOT.to_vec();
    }

    let mut out = Vec::with_capacity(name.len());
    let mut i = 0;

    while i < name.len() {
        let byte = name[i];

        if is_control(byte) {
            push_escaped(&mut out, byte);
            i += 1;
            continue;
        }

        match decode_escape(&name[i..]) {
            Some(decoded) if is_control(decoded) => out.extend_from_slice(&name[i..i + 3]),
            Some(decoded) => out.push(decoded),
            None => {
                out.push(byte);
                i += 1;
                continue;
            }
        }
        i += 3;
    }

    out
}

/// Escape raw control bytes, leaving everything else, tokens included,
/// untouched.
pub fn canonicalize(name: impl AsRef<[u8]>) -> Vec<u8> {
    let name = name.as_ref();
    let mut out = Vec::with_capacity(name.len());
    let mut i = 0;

    while i < name.len() {
        let byte = name[i];

        if is_control(byte) {
            push_escaped(&mut out, byte);
            i += 1;
        } else if decode_escape(&name[i..]).is_some() {
            out.extend_from_slice(&name[i..i + 3]);
            i += 3;
        } else {
            out.push(byte);
            i += 1;
        }
    }

    out
}

/// Apply `nfc` to every NUL-delimited segment of `name`.
///
/// NUL bytes are kept in place. If any segment is not UTF-8 or fails to
/// normalize, the result is empty: an unusable name is reported as such
/// rather than partially transformed.
pub fn normalize<F>(name: impl AsRef<[u8]>, nfc: F) -> Vec<u8>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = Vec::new();

    for (index, segment) in name.as_ref().split(|b| *b == 0).enumerate() {
        if index > 0 {
            out.push(0);
        }
        if segment.is_empty() {
            continue;
        }

        let Some(normalized) = std::str::from_utf8(segment).ok().and_then(&nfc) else {
            return Vec::new();
        };
        out.extend_from_slice(normalized.as_bytes());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(FileSystemType::Ntfs, "a:b", "a%3ab")]
    #[case(FileSystemType::Ntfs, "what?", "what%3f")]
    #[case(FileSystemType::Ntfs, "tab\there", "tab%09here")]
    #[case(FileSystemType::Ext, "a:b", "a:b")]
    #[case(FileSystemType::Ext, "a/b", "a%2fb")]
    #[case(FileSystemType::Apfs, "a:b\\c", "a%3ab\\c")]
    #[case(FileSystemType::Ext, "100%", "100%25")]
    #[case(FileSystemType::Ext, "nul\0", "nul%00")]
    #[case(FileSystemType::Fat32, "ünï:cödé", "ünï%3acödé")]
    #[case(FileSystemType::Ext, ".", "%2e")]
    #[case(FileSystemType::Ext, "..", "%2e%2e")]
    #[case(FileSystemType::Ext, "...", "...")]
    fn escape_cases(#[case] fs_type: FileSystemType, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(String::from_utf8(escape(name, fs_type)).unwrap(), expected);
    }

    #[test]
    fn escape_reescapes_existing_tokens() {
        // Exact round trip wins over idempotence.
        assert_eq!(escape("100%25", FileSystemType::Ext), b"100%2525");
        assert_eq!(unescape(escape("100%25", FileSystemType::Ext)), b"100%25");
        assert_eq!(canonicalize("100%25"), canonicalize(canonicalize("100%25")));
    }

    #[test]
    fn escape_substitutes_control_tokens() {
        // EXT stores control bytes (other than NUL) as-is.
        assert_eq!(escape("a%01b", FileSystemType::Ext), b"a\x01b");
        assert_eq!(escape("a%00b", FileSystemType::Ext), b"a%00b");
        // NTFS cannot, so the token survives unchanged.
        assert_eq!(escape("a%01b", FileSystemType::Ntfs), b"a%01b");
    }

    #[test]
    fn escape_does_not_hide_separators_in_broken_utf8() {
        assert_eq!(escape([0xe0, b'/', b'a'], FileSystemType::Ext), b"\xe0%2fa");
    }

    #[rstest]
    #[case("a%3ab", "a:b")]
    #[case("100%25", "100%")]
    #[case("%2e", ".")]
    #[case("%2e%2e", "..")]
    #[case("%2e%2e%2e", "...")]
    #[case("keep%01", "keep%01")]
    #[case("not%2Ea token", "not%2Ea token")]
    fn unescape_cases(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(String::from_utf8(unescape(name)).unwrap(), expected);
    }

    #[test]
    fn unescape_escapes_raw_controls() {
        assert_eq!(unescape(b"a\x07"), b"a%07");
    }

    #[test]
    fn canonicalize_only_touches_raw_controls() {
        assert_eq!(canonicalize(b"a\x1fb%41%01"), b"a%1fb%41%01");
        assert_eq!(canonicalize(b"plain"), b"plain");
    }

    #[test]
    fn normalize_keeps_nuls_and_clears_on_failure() {
        let upper = |s: &str| Some(s.to_uppercase());
        assert_eq!(normalize(b"ab\0cd", upper), b"AB\0CD");
        assert_eq!(normalize(b"\0x\0", upper), b"\0X\0");

        let reject_x = |s: &str| (!s.contains('x')).then(|| s.to_owned());
        assert!(normalize(b"ab\0x", reject_x).is_empty());
        assert!(normalize([b'a', 0xff], |s: &str| Some(s.to_owned())).is_empty());
    }
}
