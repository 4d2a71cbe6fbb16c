/// Sector accessor: locate, read and write sectors within synthesized tracks

use crate::error::{Result, VdiskError};
use crate::format::constants::*;
use crate::image::cursor::{CursorState, TrackCursor};
use crate::image::track::{Idam, RecordingMode, TrackLayout};
use crate::image::VirtualDisk;
use log::trace;

/// Sector ID (CHRN) as recorded in an ID field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    /// C - Cylinder number
    pub cylinder: u8,
    /// H - Head number
    pub head: u8,
    /// R - Sector ID/Record number
    pub sector: u8,
    /// N - Size code (0=128, 1=256, 2=512, 3=1024)
    pub size_code: u8,
    /// Recording mode from the IDAM slot
    pub mode: RecordingMode,
}

impl SectorId {
    /// Create a new sector ID
    pub fn new(cylinder: u8, head: u8, sector: u8, size_code: u8, mode: RecordingMode) -> Self {
        Self {
            cylinder,
            head,
            sector,
            size_code,
            mode,
        }
    }

    /// Sector size in bytes, if the size code is valid
    pub fn size_bytes(&self) -> Option<usize> {
        size_code_to_bytes(self.size_code)
    }
}

/// Find the ID field for (cyl, head, sector) in a track.
///
/// Returns the cursor state just past the sector byte, with the CRC primed
/// as the controller would have it.
fn locate(track: &[u8], cyl: u8, head: u8, sector: u8) -> Option<CursorState> {
    for idam in Idam::table(track) {
        let offset = idam.offset();
        if offset < IDAM_TABLE_SIZE || offset >= track.len() {
            trace!("Skipping IDAM slot with offset {:#06x}", offset);
            continue;
        }
        let mut cursor = TrackCursor::new(track, offset, idam.recording_mode());
        cursor.preset_crc();
        let _mark = cursor.read_byte();
        if cursor.read_byte() == cyl && cursor.read_byte() == head && cursor.read_byte() == sector
        {
            return Some(cursor.state());
        }
    }
    None
}

/// Read the data field belonging to the ID field the cursor sits in, with
/// the cursor positioned just past the R byte.
///
/// Returns `Ok(None)` when no data mark follows within the search window.
fn read_data_field(track: &[u8], state: CursorState, buf: &mut [u8]) -> Result<Option<usize>> {
    let mut cursor = TrackCursor::resume(track, state);
    let size_code = cursor.read_byte();
    let sector_size =
        size_code_to_bytes(size_code).ok_or(VdiskError::InvalidSizeCode(size_code))?;
    // ID field CRC is not verified
    cursor.skip(2);

    let mut found = false;
    for _ in 0..DAM_SEARCH_WINDOW {
        if cursor.read_byte() == DAM {
            found = true;
            break;
        }
    }
    if !found {
        return Ok(None);
    }

    let count = sector_size.min(buf.len());
    for b in buf[..count].iter_mut() {
        *b = cursor.read_byte();
    }
    buf[count..].fill(0);
    Ok(Some(count))
}

/// Slots whose offset lies inside the cell data of `track`
fn valid_idams(track: &[u8]) -> impl Iterator<Item = Idam> + '_ {
    Idam::table(track)
        .into_iter()
        .filter(move |idam| idam.offset() >= IDAM_TABLE_SIZE && idam.offset() < track.len())
}

impl VirtualDisk {
    /// Write a sector's data field
    ///
    /// The disk grows to include (cyl, head) first, so a write beyond the
    /// current geometry extends it and then fails with `SectorNotFound` on
    /// the new, unformatted track. Writes `min(data.len(), sector size)`
    /// bytes and zero-pads the rest of the field, followed by a fresh CRC.
    pub fn update_sector(&mut self, cyl: u8, head: u8, sector: u8, data: &[u8]) -> Result<()> {
        let track = self.extend(cyl as usize, head as usize)?;
        let state = locate(track, cyl, head, sector).ok_or(VdiskError::SectorNotFound {
            cylinder: cyl,
            head,
            sector,
        })?;

        let mut cursor = TrackCursor::resume(track, state);
        let size_code = cursor.read_byte();
        let sector_size =
            size_code_to_bytes(size_code).ok_or(VdiskError::InvalidSizeCode(size_code))?;
        // ID field CRC is not verified
        cursor.skip(2);

        let layout = TrackLayout::for_mode(cursor.mode());
        cursor.skip(layout.id_gap);
        cursor.write_run(0x00, layout.sync_length);
        cursor.reset_crc();
        cursor.write_run(MFM_SYNC, layout.sync_marks);
        cursor.write_byte(DAM);

        let count = data.len().min(sector_size);
        cursor.write_bytes(&data[..count]);
        cursor.write_run(0x00, sector_size - count);
        cursor.write_crc();
        cursor.write_byte(IDAM);

        self.changed = true;
        Ok(())
    }

    /// Read a sector's data field into `buf`
    ///
    /// Copies `min(sector size, buf.len())` bytes, zeroes the rest of `buf`
    /// and returns the count. Never grows the disk. If the track, sector or
    /// data mark is missing, `buf` is filled with the unformatted media byte
    /// and an error is returned.
    pub fn fetch_sector(&self, cyl: u8, head: u8, sector: u8, buf: &mut [u8]) -> Result<usize> {
        let not_found = || VdiskError::SectorNotFound {
            cylinder: cyl,
            head,
            sector,
        };
        let result = self
            .track(cyl as usize, head as usize)
            .ok_or(VdiskError::TrackNotFound {
                cylinder: cyl,
                head,
            })
            .and_then(|track| {
                let state = locate(track, cyl, head, sector).ok_or_else(not_found)?;
                read_data_field(track, state, buf)?.ok_or_else(not_found)
            });
        if result.is_err() {
            buf.fill(UNFORMATTED_BYTE);
        }
        result
    }

    /// Read the data field after IDAM slot `slot` of physical track
    /// (cyl, head), whatever C/H/R its ID field records
    ///
    /// Same buffer handling as [`fetch_sector`](Self::fetch_sector).
    pub fn fetch_slot(&self, cyl: usize, head: usize, slot: usize, buf: &mut [u8]) -> Result<usize> {
        let result = self.read_slot(cyl, head, slot, buf);
        if result.is_err() {
            buf.fill(UNFORMATTED_BYTE);
        }
        result
    }

    fn read_slot(&self, cyl: usize, head: usize, slot: usize, buf: &mut [u8]) -> Result<usize> {
        let track = self.track(cyl, head).ok_or(VdiskError::TrackNotFound {
            cylinder: cyl as u8,
            head: head as u8,
        })?;
        let idam = valid_idams(track).nth(slot).ok_or(VdiskError::SectorNotFound {
            cylinder: cyl as u8,
            head: head as u8,
            sector: slot as u8,
        })?;

        let mut cursor = TrackCursor::new(track, idam.offset(), idam.recording_mode());
        cursor.preset_crc();
        let _mark = cursor.read_byte();
        let c = cursor.read_byte();
        let h = cursor.read_byte();
        let r = cursor.read_byte();
        read_data_field(track, cursor.state(), buf)?.ok_or(VdiskError::SectorNotFound {
            cylinder: c,
            head: h,
            sector: r,
        })
    }

    /// Decode every populated ID field on a track, in physical order
    ///
    /// Index `i` of the result is slot `i` for [`fetch_slot`](Self::fetch_slot).
    pub fn sector_ids(&self, cyl: usize, head: usize) -> Vec<SectorId> {
        let track = match self.track(cyl, head) {
            Some(t) => t,
            None => return Vec::new(),
        };
        valid_idams(track)
            .map(|idam| {
                let mode = idam.recording_mode();
                let mut cursor = TrackCursor::new(track, idam.offset(), mode);
                let _mark = cursor.read_byte();
                let c = cursor.read_byte();
                let h = cursor.read_byte();
                let r = cursor.read_byte();
                let n = cursor.read_byte();
                SectorId::new(c, h, r, n, mode)
            })
            .collect()
    }
}
