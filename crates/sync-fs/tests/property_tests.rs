use proptest::prelude::*;
use std::cmp::Ordering;
use sync_fs::codec::{canonicalize, escape, unescape};
use sync_fs::{FileSystemType, Transform, local_compare, remote_compare};

fn fs_type() -> impl Strategy<Value = FileSystemType> {
    prop::sample::select(FileSystemType::ALL.to_vec())
}

fn transform() -> impl Strategy<Value = Transform> {
    prop_oneof![Just(Transform::Identity), Just(Transform::UpperCase)]
}

// Small alphabet so escapes, case pairs and multi-byte chars collide often.
const NAME: &str = "[aAbB%0-9eéÉ/:\\x01]{0,8}";

proptest! {
    #[test]
    fn test_unescape_reverses_escape(name in "\\PC*", fs in fs_type()) {
        let local = escape(&name, fs);
        prop_assert_eq!(unescape(&local), name.as_bytes());
    }

    #[test]
    fn test_escape_output_is_compatible(name in "\\PC*", fs in fs_type()) {
        let local = escape(&name, fs);
        let mut i = 0;
        while i < local.len() {
            if sync_fs::compare::is_escape(&local[i..]) {
                i += 3;
                continue;
            }
            prop_assert!(
                local[i] >= 0x80 || fs.is_compatible(local[i]),
                "byte {:#x} in {:?}",
                local[i],
                local
            );
            i += 1;
        }
    }

    #[test]
    fn test_reescaping_recovered_name_is_stable(name in "[\\PC\\x00-\\x1f]*", fs in fs_type()) {
        let local = escape(&name, fs);
        prop_assert_eq!(escape(unescape(&local), fs), local);
    }

    #[test]
    fn test_canonicalize_idempotent(bytes in prop::collection::vec(any::<u8>(), 0..32)) {
        let once = canonicalize(&bytes);
        prop_assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn test_escaped_local_equals_remote(name in "\\PC*", fs in fs_type()) {
        let local = escape(&name, fs);
        prop_assert_eq!(
            remote_compare(&local, name.as_bytes(), Transform::Identity),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_reflexive_and_antisymmetric(a in NAME, b in NAME, t in transform()) {
        prop_assert_eq!(local_compare(a.as_bytes(), a.as_bytes(), t), Ordering::Equal);
        prop_assert_eq!(
            local_compare(a.as_bytes(), b.as_bytes(), t),
            local_compare(b.as_bytes(), a.as_bytes(), t).reverse()
        );
    }

    #[test]
    fn test_compare_transitive(a in NAME, b in NAME, c in NAME, t in transform()) {
        let ab = local_compare(a.as_bytes(), b.as_bytes(), t);
        let bc = local_compare(b.as_bytes(), c.as_bytes(), t);
        if ab != Ordering::Greater && bc != Ordering::Greater {
            prop_assert_ne!(local_compare(a.as_bytes(), c.as_bytes(), t), Ordering::Greater);
        }
    }
}
