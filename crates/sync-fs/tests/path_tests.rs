use pretty_assertions::assert_eq;
use rstest::rstest;
use std::cmp::Ordering;
use sync_fs::{FileSystemType, LocalPath, Separator};

const SLASH: Separator = Separator::SLASH;
const BACKSLASH: Separator = Separator::BACKSLASH;

fn lp(s: &str) -> LocalPath {
    LocalPath::from_path(s)
}

#[rstest]
#[case("archive.tar.gz", 2, "archive.tar (2).gz")]
#[case("notes", 1, "notes (1)")]
#[case("dir.v2/readme", 3, "dir.v2/readme (3)")]
#[case("dir/.hidden", 4, "dir/ (4).hidden")]
fn test_insert_filename_counter(#[case] path: &str, #[case] counter: u32, #[case] expected: &str) {
    assert_eq!(lp(path).insert_filename_counter(counter, SLASH), lp(expected));
}

#[rstest]
#[case("", "b", false, "b")]
#[case("", "b", true, "/b")]
#[case("a", "b", false, "a/b")]
#[case("a/", "b", false, "a/b")]
#[case("a", "/b", false, "a/b")]
#[case("a/", "/b", false, "a/b")]
fn test_append_with_separator(
    #[case] base: &str,
    #[case] tail: &str,
    #[case] always: bool,
    #[case] expected: &str,
) {
    let mut path = lp(base);
    path.append_with_separator(&lp(tail), always, SLASH);
    assert_eq!(path, lp(expected));
}

#[test]
fn test_append_after_drive_root() {
    let mut path = lp("C:\\");
    path.append_with_separator(&lp("Users"), false, BACKSLASH);
    assert_eq!(path.to_path(), "C:\\Users");
}

#[rstest]
#[case("C:\\", "C:\\")]
#[case("C:\\dir\\", "C:\\dir")]
#[case("dir", "dir")]
fn test_trim_keeps_drive_root(#[case] input: &str, #[case] expected: &str) {
    let mut path = lp(input);
    path.trim_non_drive_trailing_separator(BACKSLASH);
    assert_eq!(path.to_path(), expected);
}

#[rstest]
#[case("/a/b", "/a/b/c", Some(5))]
#[case("/a/b", "/a/b", Some(4))]
#[case("/a/", "/a/b", Some(3))]
#[case("/a/b", "/a/bc", None)]
#[case("/a/b", "/a", None)]
fn test_containment_honors_separator_boundary(
    #[case] parent: &str,
    #[case] child: &str,
    #[case] expected: Option<usize>,
) {
    assert_eq!(lp(parent).is_containing_path_of(&lp(child), SLASH), expected);
}

#[test]
fn test_components_skip_repeated_separators() {
    let parts: Vec<String> =
        lp("//usr//local/bin/").components(SLASH).map(|c| c.to_path()).collect();
    assert_eq!(parts, vec!["usr", "local", "bin"]);
}

#[test]
fn test_leaf_name_and_remote_name() {
    let path = lp("/photos/a%3ab.jpg");
    let leaf = path.leaf_name(SLASH);
    assert_eq!(leaf, lp("a%3ab.jpg"));
    assert_eq!(leaf.to_name(), b"a:b.jpg");
}

#[test]
fn test_fs_compare_follows_case_rule() {
    let a = lp("Folder/File.TXT");
    let b = lp("folder/file.txt");
    assert_eq!(a.fs_compare(&b, FileSystemType::Ntfs), Ordering::Equal);
    assert_ne!(a.fs_compare(&b, FileSystemType::Ext), Ordering::Equal);
}

#[test]
fn test_ci_compare_decodes_escapes() {
    assert_eq!(lp("%41BC").ci_compare(&lp("abc")), Ordering::Equal);
    assert_ne!(lp("%41BC").compare(&lp("abc")), Ordering::Equal);
    assert_eq!(lp("a%25b").compare_remote(b"a%b"), Ordering::Equal);
}

#[test]
fn test_length_guard_restores_length() {
    let mut path = lp("/base");
    {
        let mut guard = path.length_guard();
        guard.append_with_separator(&lp("child"), false, SLASH);
        assert_eq!(*guard, lp("/base/child"));
    }
    assert_eq!(path, lp("/base"));
}

#[test]
fn test_from_name_escapes_for_target() {
    assert_eq!(LocalPath::from_name("a?b", FileSystemType::Fat32), lp("a%3fb"));
    assert_eq!(LocalPath::from_name("a?b", FileSystemType::Ext), lp("a?b"));
}
