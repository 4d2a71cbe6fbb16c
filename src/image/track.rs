/// Track synthesis: IDAM slots, FM/MFM layouts and track formatting

use crate::error::{Result, VdiskError};
use crate::format::constants::*;
use crate::image::cursor::TrackCursor;
use crate::image::VirtualDisk;
use log::{debug, warn};

/// Recording mode for a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingMode {
    /// FM (Frequency Modulation) - single density
    FM,
    /// MFM (Modified Frequency Modulation) - double density
    MFM,
}

impl RecordingMode {
    /// Mode for a controller density flag
    pub fn from_double_density(double_density: bool) -> Self {
        if double_density {
            RecordingMode::MFM
        } else {
            RecordingMode::FM
        }
    }

    /// True for MFM
    pub fn is_double_density(&self) -> bool {
        *self == RecordingMode::MFM
    }

    /// Buffer bytes occupied by one logical byte
    pub fn bytes_per_cell(&self) -> usize {
        match self {
            RecordingMode::FM => 2,
            RecordingMode::MFM => 1,
        }
    }
}

/// One IDAM table slot
///
/// Bits 0-13 hold the offset of the ID address mark within the track, bit
/// 15 is set for double density. A zero slot ends the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Idam(pub u16);

impl Idam {
    /// Double-density flag
    pub const DOUBLE_DENSITY: u16 = 0x8000;
    /// Offset mask
    pub const OFFSET_MASK: u16 = 0x3FFF;

    /// Build a slot for an address mark at `offset`
    pub fn new(offset: usize, mode: RecordingMode) -> Self {
        let flag = if mode.is_double_density() {
            Self::DOUBLE_DENSITY
        } else {
            0
        };
        Idam((offset as u16 & Self::OFFSET_MASK) | flag)
    }

    /// Read slot `slot` from the head of a track
    pub fn read(track: &[u8], slot: usize) -> Self {
        let i = slot * 2;
        Idam(u16::from_le_bytes([track[i], track[i + 1]]))
    }

    /// Store this slot into the head of a track
    pub fn write(self, track: &mut [u8], slot: usize) {
        let i = slot * 2;
        track[i..i + 2].copy_from_slice(&self.0.to_le_bytes());
    }

    /// True for the table terminator
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Offset of the address mark within the track
    pub fn offset(&self) -> usize {
        (self.0 & Self::OFFSET_MASK) as usize
    }

    /// Recording mode of the sector
    pub fn recording_mode(&self) -> RecordingMode {
        RecordingMode::from_double_density(self.0 & Self::DOUBLE_DENSITY != 0)
    }

    /// Populated slots of a track, stopping at the first empty one
    pub fn table(track: &[u8]) -> Vec<Idam> {
        (0..IDAM_SLOTS)
            .map(|slot| Idam::read(track, slot))
            .take_while(|idam| !idam.is_empty())
            .collect()
    }
}

/// Gap and sync field lengths for one recording mode, in logical bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackLayout {
    /// Gap filler byte
    pub gap_byte: u8,
    /// Gap before the index mark
    pub index_gap: usize,
    /// Zero bytes before the index mark
    pub index_sync: usize,
    /// C2 sync bytes before the index mark
    pub index_marks: usize,
    /// Gap after the index mark
    pub post_index_gap: usize,
    /// Zero bytes before each address mark
    pub sync_length: usize,
    /// A1 sync bytes before each address mark
    pub sync_marks: usize,
    /// Gap between ID field and data field
    pub id_gap: usize,
    /// Gap after the data field
    pub data_gap: usize,
}

impl TrackLayout {
    /// Double-density layout
    pub const MFM: TrackLayout = TrackLayout {
        gap_byte: 0x4E,
        index_gap: 54,
        index_sync: 9,
        index_marks: 3,
        post_index_gap: 32,
        sync_length: 12,
        sync_marks: 3,
        id_gap: 22,
        data_gap: 24,
    };

    /// Single-density layout
    pub const FM: TrackLayout = TrackLayout {
        gap_byte: 0xFF,
        index_gap: 40,
        index_sync: 6,
        index_marks: 0,
        post_index_gap: 26,
        sync_length: 6,
        sync_marks: 0,
        id_gap: 11,
        data_gap: 10,
    };

    /// Layout for a recording mode
    pub fn for_mode(mode: RecordingMode) -> &'static TrackLayout {
        match mode {
            RecordingMode::FM => &Self::FM,
            RecordingMode::MFM => &Self::MFM,
        }
    }

    /// Logical bytes from the start of the track to the first sector
    pub fn index_length(&self) -> usize {
        self.index_gap + self.index_sync + self.index_marks + 1 + self.post_index_gap
    }

    /// Logical bytes occupied by one sector including its gaps
    pub fn sector_length(&self, sector_size: usize) -> usize {
        let id_field = self.sync_length + self.sync_marks + 1 + 4 + 2;
        let data_field = self.sync_length + self.sync_marks + 1 + sector_size + 2;
        id_field + self.id_gap + data_field + self.data_gap
    }

    /// Smallest even track length holding `nsectors` sectors in `mode`
    pub fn track_length_for(mode: RecordingMode, nsectors: usize, sector_size: usize) -> usize {
        let layout = Self::for_mode(mode);
        let logical = layout.index_length() + nsectors * layout.sector_length(sector_size);
        let length = IDAM_TABLE_SIZE + logical * mode.bytes_per_cell();
        (length + 1) & !1
    }
}

impl VirtualDisk {
    /// Format one track with `nsectors` blank sectors
    ///
    /// Grows the disk if (cyl, head) lies outside the current geometry.
    /// Sectors are numbered from `first_sector` and placed in the interleave
    /// order configured for this disk.
    pub fn format_track(
        &mut self,
        double_density: bool,
        cyl: u8,
        head: u8,
        nsectors: usize,
        first_sector: u8,
        size_code: u8,
    ) -> Result<()> {
        let sector_size =
            size_code_to_bytes(size_code).ok_or(VdiskError::InvalidSizeCode(size_code))?;
        let interleave = self.config.interleave;
        let mode = RecordingMode::from_double_density(double_density);
        let layout = TrackLayout::for_mode(mode);

        let track = self.extend(cyl as usize, head as usize)?;
        track[..IDAM_TABLE_SIZE].fill(0);

        let mut idams = Vec::with_capacity(nsectors.min(IDAM_SLOTS));
        let mut cursor = TrackCursor::new(&mut *track, IDAM_TABLE_SIZE, mode);

        cursor.write_run(layout.gap_byte, layout.index_gap);
        cursor.write_run(0x00, layout.index_sync);
        cursor.write_run(MFM_INDEX_SYNC, layout.index_marks);
        cursor.write_byte(IAM);
        cursor.write_run(layout.gap_byte, layout.post_index_gap);

        for slot in 0..nsectors {
            let sector = first_sector
                .wrapping_add(interleave.sector_at(double_density, nsectors, slot) as u8);

            cursor.write_run(0x00, layout.sync_length);
            cursor.reset_crc();
            cursor.write_run(MFM_SYNC, layout.sync_marks);
            if slot < IDAM_SLOTS {
                idams.push(Idam::new(cursor.offset(), mode));
            }
            cursor.write_byte(IDAM);
            cursor.write_bytes(&[cyl, head, sector, size_code]);
            cursor.write_crc();
            cursor.write_run(layout.gap_byte, layout.id_gap);

            cursor.write_run(0x00, layout.sync_length);
            cursor.reset_crc();
            cursor.write_run(MFM_SYNC, layout.sync_marks);
            cursor.write_byte(DAM);
            cursor.write_run(UNFORMATTED_BYTE, sector_size);
            cursor.write_crc();
            cursor.write_run(layout.gap_byte, layout.data_gap);
        }

        if cursor.wrapped() {
            warn!(
                "Track overflow formatting cylinder {} head {}: {} x {} bytes",
                cyl, head, nsectors, sector_size
            );
        }
        cursor.fill_to_end(layout.gap_byte);

        for (slot, idam) in idams.into_iter().enumerate() {
            idam.write(track, slot);
        }

        self.changed = true;
        Ok(())
    }

    /// Format every track of the current geometry identically
    pub fn format_disk(
        &mut self,
        double_density: bool,
        nsectors: usize,
        first_sector: u8,
        size_code: u8,
    ) -> Result<()> {
        debug!(
            "Formatting {} cylinders x {} heads: {} sectors of code {} ({})",
            self.num_cylinders(),
            self.num_heads(),
            nsectors,
            size_code,
            if double_density { "MFM" } else { "FM" }
        );
        for cyl in 0..self.num_cylinders() {
            for head in 0..self.num_heads() {
                self.format_track(
                    double_density,
                    cyl as u8,
                    head as u8,
                    nsectors,
                    first_sector,
                    size_code,
                )?;
            }
        }
        Ok(())
    }
}
