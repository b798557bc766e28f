//! Tests for ShardedIndex
//!
//! These tests verify:
//! - Building an index from a data file
//! - Each key lands only in shard `key % shard_count`
//! - Lookups return positions that read back the stored values
//! - Manifest checks on open

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use fastindex::index::{shard_number, shard_path, IndexManifest, ShardReader};
use fastindex::record::{encode_data_record, ENTRY_SIZE};
use fastindex::{Config, FastIndexError, ShardedIndex};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(base: &Path, shard_count: usize) -> Config {
    Config::builder()
        .base_dir(base)
        .shard_count(shard_count)
        .write_buf_size(2 * ENTRY_SIZE)
        .read_buf_size(64)
        .build_workers(2)
        .build()
}

/// Write records `(key, value)` to the config's data path
fn write_data_file(config: &Config, records: &[(u64, Vec<u8>)]) -> PathBuf {
    let mut buf = BytesMut::new();
    for (key, value) in records {
        encode_data_record(*key, value, &mut buf);
    }
    fs::create_dir_all(config.data_dir()).unwrap();
    let path = config.data_path();
    File::create(&path).unwrap().write_all(&buf).unwrap();
    path
}

fn read_value(data_path: &Path, position: u64, size: u64) -> Vec<u8> {
    let mut file = File::open(data_path).unwrap();
    let mut buf = vec![0u8; size as usize];
    file.seek(SeekFrom::Start(position)).unwrap();
    file.read_exact(&mut buf).unwrap();
    buf
}

fn stringified(keys: impl IntoIterator<Item = u64>) -> Vec<(u64, Vec<u8>)> {
    keys.into_iter()
        .map(|k| (k, k.to_string().into_bytes()))
        .collect()
}

// =============================================================================
// Build Tests
// =============================================================================

#[test]
fn test_build_three_shards() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 3);
    let data_path = write_data_file(&config, &stringified(1..=6));
    let index_dir = config.index_dir();

    let report = ShardedIndex::build(&index_dir, &data_path, &config).unwrap();
    assert_eq!(report.records, 6);
    assert_eq!(report.entry_count(), 6);
    assert_eq!(report.shards.len(), 3);
    assert_eq!(report.bytes_scanned, fs::metadata(&data_path).unwrap().len());

    // Each shard holds exactly the keys congruent to its number
    for shard in 0..3 {
        let bytes = fs::read(shard_path(&index_dir, shard)).unwrap();
        assert_eq!(bytes.len() % ENTRY_SIZE, 0);

        let reader = ShardReader::open(&index_dir, shard).unwrap();
        let keys: Vec<u64> = reader.iter().map(|e| e.key).collect();
        let expected: Vec<u64> = (1..=6).filter(|k| k % 3 == shard as u64).collect();
        assert_eq!(keys, expected, "shard {}", shard);
    }

    // Every key reads back its stringified value
    let index = ShardedIndex::open(&index_dir, 3).unwrap();
    for key in 1..=6u64 {
        let location = index.find(key).unwrap();
        assert_eq!(
            read_value(&data_path, location.position, location.size),
            key.to_string().into_bytes()
        );
    }
}

#[test]
fn test_build_known_key_set() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 1);
    let records = vec![
        (20, b"twenty".to_vec()),
        (5, b"five".to_vec()),
        (15, b"fifteen".to_vec()),
        (10, b"ten".to_vec()),
    ];
    let data_path = write_data_file(&config, &records);

    ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();
    let index = ShardedIndex::open(&config.index_dir(), 1).unwrap();

    // Key 10 is the fourth record: 3 records before it (24 + 6, 24 + 4, 24 + 7)
    let location = index.find(10).unwrap();
    assert_eq!(location.size, 3);
    assert_eq!(location.position, (24 + 6) + (24 + 4) + (24 + 7) + 24);
    assert_eq!(read_value(&data_path, location.position, location.size), b"ten");

    // Smallest key in the shard is found too
    assert!(index.find(5).is_some());
    assert!(index.find(1).is_none());
    assert!(index.find(12).is_none());
}

#[test]
fn test_sharding_invariant_random_keys() {
    let temp = TempDir::new().unwrap();
    let shard_count = 7;
    let config = test_config(temp.path(), shard_count);

    let mut rng = StdRng::seed_from_u64(42);
    let mut keys: Vec<u64> = (0..500).map(|_| rng.gen_range(0..1_000_000)).collect();
    keys.sort_unstable();
    keys.dedup();
    let data_path = write_data_file(&config, &stringified(keys.iter().copied()));

    ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();
    let index = ShardedIndex::open(&config.index_dir(), shard_count).unwrap();

    for shard in 0..shard_count {
        let reader = index.shard(shard).unwrap();
        let shard_keys: Vec<u64> = reader.iter().map(|e| e.key).collect();
        assert!(shard_keys.iter().all(|k| k % shard_count as u64 == shard as u64));
        assert!(shard_keys.windows(2).all(|w| w[0] <= w[1]));
    }

    for &key in &keys {
        let location = index.find(key).unwrap();
        assert_eq!(
            read_value(&data_path, location.position, location.size),
            key.to_string().into_bytes()
        );

        // No other shard answers for this key
        let owner = ShardedIndex::shard_for(key, shard_count);
        for shard in (0..shard_count).filter(|&s| s != owner) {
            assert!(index.shard(shard).unwrap().find(key).is_none());
        }
    }
}

#[test]
fn test_build_empty_data_file() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 4);
    let data_path = write_data_file(&config, &[]);

    let report = ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();
    assert_eq!(report.records, 0);

    let index = ShardedIndex::open(&config.index_dir(), 4).unwrap();
    for key in 0..10 {
        assert!(index.find(key).is_none());
    }
}

#[test]
fn test_build_missing_data_file() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 2);

    let result = ShardedIndex::build(&config.index_dir(), &config.data_path(), &config);

    assert!(matches!(result, Err(FastIndexError::Io(_))));
    assert!(!IndexManifest::path(&config.index_dir()).exists());
}

#[test]
fn test_build_corrupt_data_file_leaves_no_manifest() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 2);
    let data_path = write_data_file(&config, &stringified(1..=3));
    ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();

    // Append a record with a zero-length key, then rebuild
    let mut file = fs::OpenOptions::new().append(true).open(&data_path).unwrap();
    file.write_all(&[0u8; 24]).unwrap();

    let result = ShardedIndex::build(&config.index_dir(), &data_path, &config);

    assert!(matches!(result, Err(FastIndexError::Corrupt(_))));
    assert!(matches!(
        ShardedIndex::open(&config.index_dir(), 2),
        Err(FastIndexError::Manifest(_))
    ));
}

#[test]
fn test_rebuild_replaces_previous_index() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 2);

    let data_path = write_data_file(&config, &stringified(1..=4));
    ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();

    let data_path = write_data_file(&config, &stringified(10..=12));
    ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();

    let index = ShardedIndex::open(&config.index_dir(), 2).unwrap();
    assert!(index.find(1).is_none());
    assert!(index.find(11).is_some());
    assert_eq!(index.manifest().entry_count, 3);
}

#[test]
fn test_rebuild_with_fewer_shards_removes_stale_files() {
    let temp = TempDir::new().unwrap();
    let data_path = write_data_file(&test_config(temp.path(), 4), &stringified(1..=8));

    let wide = test_config(temp.path(), 4);
    ShardedIndex::build(&wide.index_dir(), &data_path, &wide).unwrap();
    assert!(shard_path(&wide.index_dir(), 3).exists());

    let narrow = test_config(temp.path(), 2);
    ShardedIndex::build(&narrow.index_dir(), &data_path, &narrow).unwrap();

    let index_dir = narrow.index_dir();
    assert!(shard_path(&index_dir, 0).exists());
    assert!(shard_path(&index_dir, 1).exists());
    assert!(!shard_path(&index_dir, 2).exists());
    assert!(!shard_path(&index_dir, 3).exists());

    // Unrelated files are left alone
    assert!(IndexManifest::path(&index_dir).exists());

    let index = ShardedIndex::open(&index_dir, 2).unwrap();
    for key in 1..=8 {
        assert!(index.find(key).is_some(), "key {}", key);
    }
}

#[test]
fn test_shard_number_parsing() {
    assert_eq!(shard_number("index_0.idx"), Some(0));
    assert_eq!(shard_number("index_999.idx"), Some(999));
    assert_eq!(shard_number("MANIFEST"), None);
    assert_eq!(shard_number("index_x.idx"), None);
    assert_eq!(shard_number("index_3.idx.tmp"), None);
}

#[test]
fn test_build_with_many_workers() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .base_dir(temp.path())
        .shard_count(64)
        .write_buf_size(ENTRY_SIZE)
        .read_buf_size(1024)
        .build_workers(16)
        .build();
    let data_path = write_data_file(&config, &stringified(0..2000));

    let report = ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();
    assert_eq!(report.entry_count(), 2000);
    assert!(report.shards.windows(2).all(|w| w[0].shard < w[1].shard));

    let index = ShardedIndex::open(&config.index_dir(), 64).unwrap();
    for key in 0..2000 {
        assert!(index.find(key).is_some(), "key {}", key);
    }
}

#[test]
fn test_build_rejects_zero_shards() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 0);
    let data_path = write_data_file(&config, &stringified(1..=2));

    assert!(matches!(
        ShardedIndex::build(&config.index_dir(), &data_path, &config),
        Err(FastIndexError::Config(_))
    ));
}

// =============================================================================
// Open / Manifest Tests
// =============================================================================

#[test]
fn test_open_with_wrong_shard_count() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 3);
    let data_path = write_data_file(&config, &stringified(1..=6));
    ShardedIndex::build(&config.index_dir(), &data_path, &config).unwrap();

    assert!(matches!(
        ShardedIndex::open(&config.index_dir(), 4),
        Err(FastIndexError::Manifest(_))
    ));
}

#[test]
fn test_open_unbuilt_index() {
    let temp = TempDir::new().unwrap();

    assert!(matches!(
        ShardedIndex::open(temp.path(), 3),
        Err(FastIndexError::Manifest(_))
    ));
}

#[test]
fn test_manifest_roundtrip() {
    let temp = TempDir::new().unwrap();
    let manifest = IndexManifest::new(1000, 12345, 1 << 30);

    manifest.write(temp.path()).unwrap();

    assert_eq!(IndexManifest::read(temp.path()).unwrap(), manifest);
    assert!(manifest.check_shard_count(1000).is_ok());
    assert!(manifest.check_shard_count(999).is_err());
}

#[test]
fn test_manifest_detects_corruption() {
    let temp = TempDir::new().unwrap();
    IndexManifest::new(8, 1, 2).write(temp.path()).unwrap();

    let path = IndexManifest::path(temp.path());
    let mut bytes = fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        IndexManifest::read(temp.path()),
        Err(FastIndexError::Manifest(_))
    ));
}

#[test]
fn test_manifest_remove_is_idempotent() {
    let temp = TempDir::new().unwrap();
    IndexManifest::new(8, 1, 2).write(temp.path()).unwrap();

    IndexManifest::remove(temp.path()).unwrap();
    IndexManifest::remove(temp.path()).unwrap();

    assert!(!IndexManifest::path(temp.path()).exists());
}
