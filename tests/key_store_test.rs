use bytes::Bytes;

use radiko_auth_engine::engine::key_store::KeyStore;
use radiko_auth_engine::error::KeyStoreError;

fn store_with(blob: &[u8]) -> (tempfile::TempDir, KeyStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("authkey.dat");
    std::fs::write(&path, blob).unwrap();
    (dir, KeyStore::new(path))
}

#[test]
fn test_read_range_returns_exact_bytes() {
    let (_dir, store) = store_with(b"ABCDEFGHIJ");

    assert_eq!(&store.read_range(5, 4).unwrap()[..], b"FGHI");
    assert_eq!(&store.read_range(0, 10).unwrap()[..], b"ABCDEFGHIJ");
    assert_eq!(&store.read_range(9, 1).unwrap()[..], b"J");
    assert!(store.read_range(10, 0).unwrap().is_empty());
}

#[test]
fn test_out_of_bounds_range_fails_instead_of_truncating() {
    let (_dir, store) = store_with(b"ABCDEFGHIJ");

    for (offset, length) in [(7u64, 4u64), (10, 1), (11, 0), (u64::MAX, 1)] {
        let err = store.read_range(offset, length).unwrap_err();
        match err {
            KeyStoreError::OutOfRange { blob_len, .. } => assert_eq!(blob_len, 10),
            other => panic!("unexpected error for ({offset}, {length}): {other}"),
        }
    }
}

#[test]
fn test_partial_key_is_standard_base64_of_the_range() {
    let (_dir, store) = store_with(b"ABCDEFGHIJ");

    assert_eq!(store.partial_key(5, 4).unwrap(), "RkdISQ==");
    assert_eq!(store.partial_key(0, 3).unwrap(), "QUJD");
}

#[test]
fn test_missing_blob_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path().join("authkey.dat"));

    assert!(!store.exists());
    let err = store.read_range(0, 1).unwrap_err();
    assert!(matches!(err, KeyStoreError::MissingBlob { .. }), "{err}");
}

#[test]
fn test_replace_swaps_the_blob_wholesale() {
    let (_dir, store) = store_with(b"old-key-material");
    assert_eq!(&store.read_range(0, 3).unwrap()[..], b"old");

    store.replace(Bytes::from_static(b"new")).unwrap();
    assert_eq!(&store.read_range(0, 3).unwrap()[..], b"new");
    assert!(store.read_range(0, 4).is_err());

    // The persisted artifact must match the replacement.
    assert_eq!(std::fs::read(store.path()).unwrap(), b"new");
}
