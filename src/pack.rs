//! Pack splitter — reverses the chunk-interleave transform that packs a
//! folder's payload applies when it holds more than one pack.
//!
//! # Trailing control block
//! The last byte of the payload is the chunk count `C`. Immediately before
//! it sits a `C * N * 4`-byte block of signed 32-bit big-endian deltas,
//! arranged chunk-major, pack-minor: `delta[chunk][pack]`. Within a chunk
//! the deltas accumulate into a running length for that (chunk, pack)
//! cell; everything before the control block is the concatenation of
//! those cells in the same chunk-major, pack-minor order.
//!
//! When `N == 1` this degenerates to a `C * 4`-byte control block with a
//! single pack spanning everything before it — the general algorithm
//! below already produces that without a special case.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error(
        "archive {archive_id} folder {folder_id}: payload too short for its control block: \
         need at least {needed} bytes, have {available}"
    )]
    TooShort {
        archive_id: u32,
        folder_id: u32,
        needed: usize,
        available: usize,
    },
    #[error(
        "archive {archive_id} folder {folder_id}: cumulative pack address {address} exceeds \
         the control-block offset {limit}"
    )]
    Overflow {
        archive_id: u32,
        folder_id: u32,
        address: usize,
        limit: usize,
    },
}

/// Split `data` into `pack_count` packs using the trailing control block.
///
/// `archive_id`/`folder_id` are carried only to give errors enough context
/// to locate the fault.
pub fn split(archive_id: u32, folder_id: u32, data: &[u8], pack_count: usize) -> Result<Vec<Vec<u8>>, PackError> {
    if pack_count == 0 {
        return Ok(Vec::new());
    }
    if data.is_empty() {
        return Err(PackError::TooShort { archive_id, folder_id, needed: 1, available: 0 });
    }

    let chunk_count = *data.last().expect("checked non-empty above") as usize;
    let control_len = chunk_count
        .checked_mul(pack_count)
        .and_then(|n| n.checked_mul(4))
        .ok_or(PackError::TooShort { archive_id, folder_id, needed: usize::MAX, available: data.len() })?;

    if data.len() < 1 + control_len {
        return Err(PackError::TooShort {
            archive_id,
            folder_id,
            needed: 1 + control_len,
            available: data.len(),
        });
    }
    let control_offset = data.len() - 1 - control_len;
    let control = &data[control_offset..data.len() - 1];

    let mut chunk_lengths = vec![vec![0usize; pack_count]; chunk_count];
    for (chunk, row) in chunk_lengths.iter_mut().enumerate() {
        let mut running: i64 = 0;
        for (pack, length) in row.iter_mut().enumerate() {
            let idx = (chunk * pack_count + pack) * 4;
            let delta = i32::from_be_bytes(control[idx..idx + 4].try_into().unwrap());
            running += delta as i64;
            if running < 0 {
                return Err(PackError::Overflow { archive_id, folder_id, address: 0, limit: control_offset });
            }
            *length = running as usize;
        }
    }

    let mut packs: Vec<Vec<u8>> = (0..pack_count).map(|_| Vec::new()).collect();
    let mut address = 0usize;
    for row in &chunk_lengths {
        for (pack, &length) in row.iter().enumerate() {
            let end = address
                .checked_add(length)
                .ok_or(PackError::Overflow { archive_id, folder_id, address, limit: control_offset })?;
            if end > control_offset {
                return Err(PackError::Overflow { archive_id, folder_id, address: end, limit: control_offset });
            }
            packs[pack].extend_from_slice(&data[address..end]);
            address = end;
        }
    }

    Ok(packs)
}
