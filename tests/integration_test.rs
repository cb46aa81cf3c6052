use assetcache::crypto::ZERO_KEY;
use assetcache::Cache;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const PAGE_SIZE: usize = 520;

/// Appends one folder's worth of pages to `main`, splitting `blob` across
/// as many 512-byte pages as needed. Returns (first_page, total_size).
fn append_folder_pages(main: &mut Vec<u8>, blob: &[u8]) -> (u32, u32) {
    let first_page = (main.len() / PAGE_SIZE) as u32;
    let mut remaining = blob;
    let mut position: u16 = 0;
    let mut page_numbers = Vec::new();

    while !remaining.is_empty() {
        page_numbers.push((main.len() / PAGE_SIZE) as u32);
        let take = remaining.len().min(512);
        let mut page = vec![0u8; PAGE_SIZE];
        BigEndian::write_u16(&mut page[0..2], page_numbers.last().copied().unwrap() as u16);
        BigEndian::write_u16(&mut page[2..4], position);
        page[8..8 + take].copy_from_slice(&remaining[..take]);
        main.extend_from_slice(&page);
        remaining = &remaining[take..];
        position += 1;
    }

    // Patch each page's tail to point at the next page in the chain.
    for (i, &page_no) in page_numbers.iter().enumerate() {
        let tail = page_numbers.get(i + 1).copied().unwrap_or(0);
        let base = page_no as usize * PAGE_SIZE;
        main[base + 4] = (tail >> 16) as u8;
        main[base + 5] = (tail >> 8) as u8;
        main[base + 6] = tail as u8;
    }

    (first_page, blob.len() as u32)
}

fn index_record(first_page: u32, size: u32) -> [u8; 6] {
    [
        (size >> 16) as u8,
        (size >> 8) as u8,
        size as u8,
        (first_page >> 16) as u8,
        (first_page >> 8) as u8,
        first_page as u8,
    ]
}

fn uncompressed_folder_blob(payload: &[u8]) -> Vec<u8> {
    let mut blob = vec![0u8];
    let mut size = [0u8; 4];
    BigEndian::write_u32(&mut size, payload.len() as u32);
    blob.extend_from_slice(&size);
    blob.extend_from_slice(payload);
    blob
}

fn archive_manifest_blob(entries: &[(u32, u32, u32, u16)]) -> Vec<u8> {
    // entries: (folder_id, crc, version, pack_count), ids ascending.
    let mut am = Vec::new();
    am.write_u8(5).unwrap(); // format, unversioned
    am.write_u8(0).unwrap(); // directive: no labels
    am.write_u16::<BigEndian>(entries.len() as u16).unwrap();

    let mut prev = 0u32;
    for &(id, _, _, _) in entries {
        am.write_u16::<BigEndian>((id - prev) as u16).unwrap();
        prev = id;
    }
    for &(_, crc, _, _) in entries {
        am.write_u32::<BigEndian>(crc).unwrap();
    }
    for &(_, _, version, _) in entries {
        am.write_u32::<BigEndian>(version).unwrap();
    }
    for &(_, _, _, pack_count) in entries {
        am.write_u16::<BigEndian>(pack_count).unwrap();
    }
    uncompressed_folder_blob(&am)
}

fn write_file(path: &Path, contents: &[u8]) {
    let mut f = File::create(path).unwrap();
    f.write_all(contents).unwrap();
}

#[test]
fn reads_folder_manifest_and_packs_from_an_on_disk_bundle() {
    let dir = tempfile::tempdir().unwrap();

    // Archive 0, folder 0: two packs ("AAAA"+"BB" | "aa"+"bbbb"), single chunk.
    let pack_a = b"AAAA".to_vec();
    let pack_b = b"BB".to_vec();
    let mut folder0_payload = Vec::new();
    folder0_payload.extend_from_slice(&pack_a);
    folder0_payload.extend_from_slice(&pack_b);
    // Control-block deltas are relative to the running per-chunk length,
    // not raw pack lengths: delta = len(pack) - running_length_so_far.
    let delta_a = pack_a.len() as i32;
    let delta_b = pack_b.len() as i32 - delta_a;
    folder0_payload.extend_from_slice(&delta_a.to_be_bytes());
    folder0_payload.extend_from_slice(&delta_b.to_be_bytes());
    folder0_payload.push(1); // one chunk

    let mut main = vec![0u8; PAGE_SIZE]; // page 0 reserved/unused
    let (folder0_page, folder0_size) = append_folder_pages(&mut main, &uncompressed_folder_blob(&folder0_payload));

    let mut idx0 = Vec::new();
    idx0.extend_from_slice(&index_record(folder0_page, folder0_size));

    // Archive 255: manifest for archive 0, describing folder 0.
    let am_blob = archive_manifest_blob(&[(0, 0x1234_5678, 99, 2)]);
    let (am_page, am_size) = append_folder_pages(&mut main, &am_blob);
    let mut idx255 = Vec::new();
    idx255.extend_from_slice(&index_record(am_page, am_size));

    write_file(&dir.path().join("main_file_cache.dat2"), &main);
    write_file(&dir.path().join("main_file_cache.idx0"), &idx0);
    write_file(&dir.path().join("main_file_cache.idx255"), &idx255);

    let cache = Cache::open_dir(dir.path(), 1).unwrap();

    assert_eq!(cache.archive_count(), 1);
    assert_eq!(cache.index_count(), 2);

    let folder = cache.get_folder(0, 0, &ZERO_KEY).unwrap();
    assert_eq!(folder.payload, folder0_payload);

    let manifest = cache.get_archive_manifest(0).unwrap();
    assert_eq!(manifest.version, 99);
    assert_eq!(manifest.folder(0).unwrap().crc, 0x1234_5678);
    assert_eq!(manifest.folder(0).unwrap().pack_count, 2);

    let packs = cache.get_packs(0, 0, &ZERO_KEY).unwrap();
    assert_eq!(packs, vec![pack_a, pack_b]);

    let release = cache.get_release_manifest().unwrap();
    assert_eq!(release.archive_count(), 1);
    assert_eq!(release.versions[0], 99);

    let wire = release.to_bytes();
    let back = assetcache::ReleaseManifest::from_bytes(&wire).unwrap();
    assert_eq!(back, release);
}

#[test]
fn missing_archive_index_stops_enumeration_not_the_whole_load() {
    let dir = tempfile::tempdir().unwrap();
    let main = vec![0u8; PAGE_SIZE];
    write_file(&dir.path().join("main_file_cache.dat2"), &main);
    write_file(&dir.path().join("main_file_cache.idx0"), &[]);
    // idx1 is intentionally absent.
    write_file(&dir.path().join("main_file_cache.idx255"), &[]);

    let cache = Cache::open_dir(dir.path(), 5).unwrap();
    assert_eq!(cache.archive_count(), 1);
}
