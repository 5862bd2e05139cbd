use std::borrow::Cow;

use bytes::BytesMut;
use canonpath::path::{clean_bytes_mut, clean_path, clean_path_vec, is_clean};

/// (input, want) pairs built from a single segment of `n` bytes.
fn long_paths() -> Vec<(String, String)> {
    let mut cases = Vec::new();
    for n in 1..=1234 {
        let seg = "a".repeat(n);
        let want = format!("/{seg}");
        cases.push((want.clone(), want.clone()));
        cases.push((seg.clone(), want.clone()));
        cases.push((format!("//{seg}"), want.clone()));
        cases.push((format!("/{seg}/b/.."), want));
    }
    cases
}

#[test]
fn long_single_segments() {
    for (path, want) in long_paths() {
        assert_eq!(clean_path(&path), want, "clean_path of {} bytes", path.len());
        assert_eq!(clean_path(&want), want);
    }
}

#[test]
fn long_single_segments_do_not_allocate_when_clean() {
    for (_, want) in long_paths() {
        assert!(matches!(clean_path(&want), Cow::Borrowed(_)));
        assert!(is_clean(want.as_bytes()));
    }
}

#[test]
fn long_single_segments_in_owned_buffers() {
    for (path, want) in long_paths() {
        assert_eq!(clean_path_vec(path.clone().into_bytes()), want.as_bytes());
        assert_eq!(&clean_bytes_mut(BytesMut::from(path.as_bytes()))[..], want.as_bytes());
    }
}
