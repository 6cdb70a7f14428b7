use huc_store::chain::{read_canonical_hash, write_canonical_hash};
use huc_store::meta::{read_database_version, write_database_version, BLOCKCHAIN_VERSION};
use huc_store::{DatabaseOpener, StoreError};
use huc_store_lmdb::LmdbOpener;
use huc_types::Hash;

#[test]
fn put_get_delete() {
    let dir = tempfile::tempdir().unwrap();
    let db = LmdbOpener::new(dir.path()).open("chaindata", 16, 16).unwrap();

    db.put(b"k", b"v").unwrap();
    assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
    assert!(db.has(b"k").unwrap());

    db.delete(b"k").unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);
    db.delete(b"k").unwrap();
}

#[test]
fn prefix_scan_is_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let db = LmdbOpener::new(dir.path()).open("chaindata", 16, 16).unwrap();

    db.put(b"lb", b"2").unwrap();
    db.put(b"la", b"1").unwrap();
    db.put(b"m", b"3").unwrap();

    assert_eq!(
        db.keys_with_prefix(b"l").unwrap(),
        vec![b"la".to_vec(), b"lb".to_vec()]
    );
}

#[test]
fn closed_database_rejects_operations() {
    let dir = tempfile::tempdir().unwrap();
    let db = LmdbOpener::new(dir.path()).open("chaindata", 16, 16).unwrap();
    db.close();
    assert!(db.is_closed());
    assert!(matches!(db.get(b"k"), Err(StoreError::Closed)));
    assert!(matches!(db.put(b"k", b"v"), Err(StoreError::Closed)));
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let hash = Hash::digest(b"genesis");
    {
        let db = LmdbOpener::new(dir.path()).open("chaindata", 16, 16).unwrap();
        write_database_version(db.as_ref(), BLOCKCHAIN_VERSION).unwrap();
        write_canonical_hash(db.as_ref(), &hash, 0).unwrap();
        db.close();
    }
    let db = LmdbOpener::new(dir.path()).open("chaindata", 16, 16).unwrap();
    assert_eq!(read_database_version(db.as_ref()).unwrap(), Some(BLOCKCHAIN_VERSION));
    assert_eq!(read_canonical_hash(db.as_ref(), 0).unwrap(), Some(hash));
}
