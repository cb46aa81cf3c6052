//! Page-chain reassembler — walks the linked chain of pages that together
//! form one folder blob.
//!
//! Each page declares its own 0-based position in the chain and the page
//! number of its successor (`tail`); the chain ends once the record's
//! declared size has been collected. Per-step integrity checking is
//! limited to `position` — `pageId` is never compared against the folder
//! id being read, since folder ids can exceed 16 bits while `pageId` on
//! the wire cannot.

use thiserror::Error;

use crate::page::{Page, PAGE_PAYLOAD_SIZE, PAGE_SIZE};

#[derive(Error, Debug)]
pub enum ChainError {
    #[error(
        "archive {archive_id} folder {folder_id}: page chain position mismatch, \
         expected {expected}, found {actual}"
    )]
    PositionMismatch {
        archive_id: u32,
        folder_id: u32,
        expected: u16,
        actual: u16,
    },
    #[error(
        "archive {archive_id} folder {folder_id}: page at offset {offset} is out of \
         bounds (main data is {main_len} bytes)"
    )]
    OutOfBounds {
        archive_id: u32,
        folder_id: u32,
        offset: u64,
        main_len: usize,
    },
}

/// Reassemble exactly `total_size` bytes starting at `start_offset` in `main`.
pub fn read_chain(
    main: &[u8],
    archive_id: u32,
    folder_id: u32,
    start_offset: u64,
    total_size: u32,
) -> Result<Vec<u8>, ChainError> {
    let mut out = Vec::with_capacity(total_size as usize);
    let mut offset = start_offset;
    let mut remaining: i64 = total_size as i64;
    let mut expected_position: u16 = 0;

    while remaining > 0 {
        let end = offset + PAGE_SIZE as u64;
        if end > main.len() as u64 {
            return Err(ChainError::OutOfBounds { archive_id, folder_id, offset, main_len: main.len() });
        }

        let page = Page::read(&main[offset as usize..]).expect("bounds verified above");

        if page.header.position != expected_position {
            return Err(ChainError::PositionMismatch {
                archive_id,
                folder_id,
                expected: expected_position,
                actual: page.header.position,
            });
        }

        let take = remaining.min(PAGE_PAYLOAD_SIZE as i64) as usize;
        out.extend_from_slice(&page.payload[..take]);

        offset = page.header.tail as u64 * PAGE_SIZE as u64;
        remaining -= PAGE_PAYLOAD_SIZE as i64;
        expected_position = expected_position.wrapping_add(1);
    }

    Ok(out)
}
