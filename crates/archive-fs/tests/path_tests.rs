use archive_fs::{ArchivePath, Error};
use rstest::rstest;
use std::path::Path;

#[rstest]
#[case("foo/bar/baz", "foo/bar/baz")]
#[case("foo\\bar\\baz", "foo/bar/baz")]
#[case("foo/bar\\baz", "foo/bar/baz")]
#[case("foo//bar", "foo/bar")]
#[case("./foo/./bar/", "foo/bar")]
#[case("A/1.txt", "A/1.txt")]
fn test_normalizes(#[case] input: &str, #[case] expected: &str) {
    let path = ArchivePath::new(input).unwrap();
    assert_eq!(path.as_str(), expected);
}

#[rstest]
#[case("")]
#[case("/")]
#[case("./")]
#[case("/etc/passwd")]
#[case("\\\\server\\share")]
#[case("C:/Windows")]
#[case("c:file.txt")]
#[case("../outside")]
#[case("a/../../b")]
#[case("a/..")]
#[case("nul\0byte")]
fn test_rejects_malicious_or_empty(#[case] input: &str) {
    let result = ArchivePath::new(input);
    assert!(
        matches!(result, Err(Error::InvalidPath { .. })),
        "{:?} should be rejected, got {:?}",
        input,
        result
    );
}

#[test]
fn test_to_native_stays_below_root() {
    let root = Path::new("/archive/root");
    let path = ArchivePath::new("2022/02/01.JPG").unwrap();
    let native = path.to_native(root);
    assert!(native.starts_with(root));
    assert!(native.ends_with("01.JPG"));
}

#[test]
fn test_from_relative_native_path() {
    let native = Path::new("photos").join("2022").join("a.jpg");
    let path = ArchivePath::from_relative(&native).unwrap();
    assert_eq!(path.as_str(), "photos/2022/a.jpg");
}

#[cfg(unix)]
#[test]
fn test_from_relative_rejects_unportable_names() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let backslash = Path::new("photos").join("a\\b.txt");
    assert!(matches!(
        ArchivePath::from_relative(&backslash),
        Err(Error::InvalidPath { .. })
    ));

    let lossy = Path::new("photos").join(OsStr::from_bytes(b"bad\xff.txt"));
    assert!(matches!(
        ArchivePath::from_relative(&lossy),
        Err(Error::InvalidPath { .. })
    ));
}

#[test]
fn test_join_validates_segment() {
    let base = ArchivePath::new("photos").unwrap();
    assert_eq!(base.join("a.jpg").unwrap().as_str(), "photos/a.jpg");
    assert!(base.join("../../x").is_err());
}

#[test]
fn test_ordering_is_lexicographic() {
    let mut paths = vec![
        ArchivePath::new("b.txt").unwrap(),
        ArchivePath::new("a/z.txt").unwrap(),
        ArchivePath::new("a.txt").unwrap(),
    ];
    paths.sort();
    let names: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "a/z.txt", "b.txt"]);
}
