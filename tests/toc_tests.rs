//! Tests for the Table of Contents
//!
//! These tests verify:
//! - Append-only allocation from the end of the reserved region
//! - Key uniqueness and key validation
//! - Removal without space reclamation
//! - Growing the last entry only
//! - Flush/load round trips, including deleted entries
//! - Detection of striping mismatches and corrupted regions

use std::path::PathBuf;

use stripestore::address::{Address, Striping};
use stripestore::toc::{Toc, HEADER_SIZE, MAX_KEY_LEN};
use stripestore::volume::{OpenMode, VolumeSet};
use stripestore::StoreError;
use tempfile::TempDir;

const REGION: u64 = 4096;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup(volumes: usize) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    let paths = (0..volumes)
        .map(|i| dir.path().join(format!("toc.vol{}", i)))
        .collect();
    (dir, paths)
}

fn open_set(paths: &[PathBuf]) -> VolumeSet {
    let mut set = VolumeSet::new(8);
    set.open(paths, OpenMode::Old).unwrap();
    set
}

fn single() -> Striping {
    Striping::new(1, 1024, 8).unwrap()
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_new_toc_is_empty() {
    let toc = Toc::new(single(), REGION).unwrap();

    assert!(toc.is_empty());
    assert_eq!(toc.len(), 0);
    assert_eq!(toc.watermark(), REGION);
    assert!(!toc.is_dirty());
}

#[test]
fn test_region_too_small_rejected() {
    let result = Toc::new(single(), HEADER_SIZE);
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_region_too_large_rejected() {
    let largest = HEADER_SIZE + u32::MAX as u64;
    assert!(Toc::new(single(), largest).is_ok());

    let result = Toc::new(single(), largest + 1);
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_stripe_smaller_than_header_rejected() {
    let narrow = Striping::new(2, 16, 8).unwrap();
    let result = Toc::new(narrow, REGION);
    assert!(matches!(result, Err(StoreError::Config(_))));

    // one volume never wraps, so any stripe works
    assert!(Toc::new(Striping::new(1, 16, 8).unwrap(), REGION).is_ok());
    assert!(Toc::new(Striping::new(2, HEADER_SIZE, 8).unwrap(), REGION).is_ok());
}

// =============================================================================
// Insert/Lookup Tests
// =============================================================================

#[test]
fn test_insert_then_lookup() {
    let mut toc = Toc::new(single(), REGION).unwrap();

    let address = toc.insert("geometry", 120).unwrap();
    assert_eq!(address, Address::new(0, REGION));

    let entry = toc.lookup("geometry").unwrap();
    assert_eq!(entry.address, address);
    assert_eq!(entry.size, 120);
    assert_eq!(toc.watermark(), REGION + 120);
    assert!(toc.is_dirty());
}

#[test]
fn test_insert_allocates_monotonically() {
    let mut toc = Toc::new(single(), REGION).unwrap();

    let a = toc.insert("a", 10).unwrap();
    let b = toc.insert("b", 0).unwrap();
    let c = toc.insert("c", 5).unwrap();

    assert_eq!(a.offset, REGION);
    assert_eq!(b.offset, REGION + 10);
    assert_eq!(c.offset, REGION + 10);
    assert_eq!(toc.extent("c").unwrap(), (REGION + 10, 5));
    assert_eq!(toc.watermark(), REGION + 15);
}

#[test]
fn test_insert_on_striped_unit_returns_physical_address() {
    let striping = Striping::new(2, 1024, 8).unwrap();
    let mut toc = Toc::new(striping, 1000).unwrap();

    toc.insert("first", 100).unwrap();
    let second = toc.insert("second", 10).unwrap();

    // logical 1100 falls in stripe 1
    assert_eq!(second, Address::new(1, 76));
    assert_eq!(toc.extent("second").unwrap(), (1100, 10));
}

#[test]
fn test_duplicate_key_rejected() {
    let mut toc = Toc::new(single(), REGION).unwrap();
    let original = toc.insert("energy", 8).unwrap();

    let result = toc.insert("energy", 64);

    assert!(matches!(result, Err(StoreError::KeyExists(ref k)) if k == "energy"));
    let entry = toc.lookup("energy").unwrap();
    assert_eq!(entry.address, original);
    assert_eq!(entry.size, 8);
    assert_eq!(toc.watermark(), REGION + 8);
}

#[test]
fn test_lookup_missing_key() {
    let toc = Toc::new(single(), REGION).unwrap();

    let err = toc.lookup("nothing").unwrap_err();
    assert!(matches!(err, StoreError::KeyNotFound(_)));
    assert!(!err.is_io());
    assert!(toc.get("nothing").is_none());
}

#[test]
fn test_invalid_keys_rejected() {
    let mut toc = Toc::new(single(), REGION).unwrap();

    assert!(matches!(toc.insert("", 1), Err(StoreError::InvalidKey(_))));

    let long = "k".repeat(MAX_KEY_LEN + 1);
    assert!(matches!(toc.insert(&long, 1), Err(StoreError::InvalidKey(_))));

    let exact = "k".repeat(MAX_KEY_LEN);
    assert!(toc.insert(&exact, 1).is_ok());
}

#[test]
fn test_toc_overflow_rejected() {
    // room for the header, the vec prefix and one short entry
    let mut toc = Toc::new(single(), HEADER_SIZE + 8 + 40).unwrap();

    toc.insert("a", 1).unwrap();
    let result = toc.insert("b", 1);

    assert!(matches!(result, Err(StoreError::TocOverflow { .. })));
    assert!(!toc.contains("b"));
    assert_eq!(toc.len(), 1);
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove_does_not_reclaim_space() {
    let mut toc = Toc::new(single(), REGION).unwrap();
    let first = toc.insert("scratch", 50).unwrap();

    toc.remove("scratch").unwrap();

    assert!(matches!(toc.lookup("scratch"), Err(StoreError::KeyNotFound(_))));
    assert_eq!(toc.watermark(), REGION + 50);
    assert_eq!(toc.history().len(), 1);
    assert!(toc.history()[0].deleted);

    let second = toc.insert("scratch", 50).unwrap();
    assert_ne!(first, second);
    assert_eq!(second.offset, REGION + 50);
    assert_eq!(toc.iter().count(), 1);
    assert_eq!(toc.history().len(), 2);
}

#[test]
fn test_remove_missing_key() {
    let mut toc = Toc::new(single(), REGION).unwrap();
    assert!(matches!(toc.remove("ghost"), Err(StoreError::KeyNotFound(_))));
}

// =============================================================================
// Grow Tests
// =============================================================================

#[test]
fn test_grow_last_entry() {
    let mut toc = Toc::new(single(), REGION).unwrap();
    toc.insert("first", 10).unwrap();
    toc.insert("last", 10).unwrap();

    toc.grow("last", 30).unwrap();

    assert_eq!(toc.lookup("last").unwrap().size, 30);
    assert_eq!(toc.watermark(), REGION + 40);
}

#[test]
fn test_grow_inner_entry_rejected() {
    let mut toc = Toc::new(single(), REGION).unwrap();
    toc.insert("first", 10).unwrap();
    toc.insert("last", 10).unwrap();

    let result = toc.grow("first", 11);

    assert!(matches!(result, Err(StoreError::EntryOverflow { size: 10, requested: 11, .. })));
    assert_eq!(toc.lookup("first").unwrap().size, 10);
    assert_eq!(toc.watermark(), REGION + 20);
}

#[test]
fn test_grow_to_smaller_size_is_noop() {
    let mut toc = Toc::new(single(), REGION).unwrap();
    toc.insert("first", 10).unwrap();
    toc.insert("last", 10).unwrap();

    toc.grow("first", 4).unwrap();
    assert_eq!(toc.lookup("first").unwrap().size, 10);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_load_empty_volume() {
    let (_dir, paths) = setup(1);
    let mut set = open_set(&paths);

    let toc = Toc::load(&mut set, single(), REGION).unwrap();

    assert!(toc.is_empty());
    assert_eq!(toc.watermark(), REGION);
}

#[test]
fn test_flush_then_load_round_trip() {
    let (_dir, paths) = setup(3);
    let striping = Striping::new(3, 256, 8).unwrap();

    {
        let mut set = open_set(&paths);
        let mut toc = Toc::new(striping, 1000).unwrap();
        toc.insert("alpha", 300).unwrap();
        toc.insert("beta", 7).unwrap();
        toc.insert("gamma", 1024).unwrap();
        toc.remove("beta").unwrap();
        toc.flush(&mut set).unwrap();
        assert!(!toc.is_dirty());
        set.close().unwrap();
    }

    let mut set = open_set(&paths);
    let toc = Toc::load(&mut set, striping, 1000).unwrap();

    assert_eq!(toc.len(), 2);
    assert_eq!(toc.history().len(), 3);
    assert_eq!(toc.watermark(), 1000 + 300 + 7 + 1024);
    assert!(matches!(toc.lookup("beta"), Err(StoreError::KeyNotFound(_))));

    let alpha = toc.lookup("alpha").unwrap();
    assert_eq!(alpha.address, striping.translate(1000));
    assert_eq!(alpha.size, 300);
    assert_eq!(toc.extent("gamma").unwrap(), (1307, 1024));

    let keys: Vec<&str> = toc.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["alpha", "gamma"]);
}

#[test]
fn test_clean_toc_is_not_written() {
    let (_dir, paths) = setup(1);
    let mut set = open_set(&paths);

    let mut toc = Toc::new(single(), REGION).unwrap();
    toc.flush(&mut set).unwrap();

    assert_eq!(set.volume_len(0).unwrap(), 0);
}

#[test]
fn test_load_with_different_striping_rejected() {
    let (_dir, paths) = setup(2);
    let written = Striping::new(2, 1024, 8).unwrap();
    {
        let mut set = open_set(&paths);
        let mut toc = Toc::new(written, REGION).unwrap();
        toc.insert("x", 1).unwrap();
        toc.flush(&mut set).unwrap();
    }

    let mut set = open_set(&paths);
    let other = Striping::new(2, 2048, 8).unwrap();
    let result = Toc::load(&mut set, other, REGION);
    assert!(matches!(result, Err(StoreError::Config(_))));

    let result = Toc::load(&mut set, written, REGION * 2);
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_corrupted_payload_detected() {
    let (_dir, paths) = setup(1);
    let mut set = open_set(&paths);

    let mut toc = Toc::new(single(), REGION).unwrap();
    toc.insert("alpha", 10).unwrap();
    toc.flush(&mut set).unwrap();

    let mut byte = [0u8; 1];
    set.read_at(0, HEADER_SIZE + 10, &mut byte).unwrap();
    byte[0] ^= 0xFF;
    set.write_at(0, HEADER_SIZE + 10, &byte).unwrap();

    let result = Toc::load(&mut set, single(), REGION);
    assert!(matches!(result, Err(StoreError::Corruption(_))));
}

#[test]
fn test_watermark_inside_region_detected() {
    let (_dir, paths) = setup(1);
    let mut set = open_set(&paths);

    let mut toc = Toc::new(single(), REGION).unwrap();
    toc.insert("alpha", 64).unwrap();
    toc.flush(&mut set).unwrap();

    // watermark field follows magic, version, flags, volume count,
    // stripe size and region size
    set.write_at(0, 28, &0u64.to_le_bytes()).unwrap();

    let result = Toc::load(&mut set, single(), REGION);
    assert!(matches!(result, Err(StoreError::Corruption(_))));
}

#[test]
fn test_bad_magic_detected() {
    let (_dir, paths) = setup(1);
    let mut set = open_set(&paths);
    set.write_at(0, 0, &[0x42u8; HEADER_SIZE as usize]).unwrap();

    let result = Toc::load(&mut set, single(), REGION);
    assert!(matches!(result, Err(StoreError::Corruption(_))));
}

#[test]
fn test_truncated_header_detected() {
    let (_dir, paths) = setup(1);
    let mut set = open_set(&paths);
    set.write_at(0, 0, b"STOC").unwrap();

    let result = Toc::load(&mut set, single(), REGION);
    assert!(matches!(result, Err(StoreError::Corruption(_))));
}

// =============================================================================
// Display Tests
// =============================================================================

#[test]
fn test_display_lists_entries() {
    let mut toc = Toc::new(single(), REGION).unwrap();
    toc.insert("density_matrix", 64).unwrap();
    toc.insert("old", 1).unwrap();
    toc.remove("old").unwrap();

    let printed = toc.to_string();

    assert!(printed.contains("1 live / 2 total"));
    assert!(printed.contains("density_matrix"));
    assert!(printed.contains("(deleted)"));
}
