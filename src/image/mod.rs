/// Virtual disk data structures

/// Builder for creating formatted disks
pub mod builder;
/// Track cursor shared by the synthesizer and sector accessor
pub(crate) mod cursor;
/// Per-head track storage
pub mod disk;
/// Sector locate/read/write
pub mod sector;
/// IDAM slots and track synthesis
pub mod track;

pub use builder::VirtualDiskBuilder;
pub use disk::Side;
pub use sector::SectorId;
pub use track::{Idam, RecordingMode, TrackLayout};

use crate::config::DiskConfig;
use crate::error::{Result, VdiskError};
use crate::format::constants::*;
use crate::format::DiskFormat;
use crate::io::jvc::JvcParams;
use crate::io::vdk::VdkExtras;
use crate::io::FileRequester;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Header data carried between loading and saving a particular format
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatExtras {
    /// VDK header fields beyond the fixed 12 bytes
    pub vdk: Option<VdkExtras>,
    /// JVC geometry parameters and raw header
    pub jvc: Option<JvcParams>,
    /// Loaded from a headerless OS-9 sector dump; saved without a header
    pub headerless_os9: bool,
}

/// An emulated floppy disk
///
/// Each head owns one buffer of `num_cylinders * track_length` bytes. Every
/// track starts with a 128-byte table of IDAM slots followed by the raw
/// cell data as a controller would see it.
#[derive(Debug, Clone)]
pub struct VirtualDisk {
    /// Format the disk came from, and will be saved as
    pub(crate) source_format: DiskFormat,
    pub(crate) num_cylinders: usize,
    pub(crate) track_length: usize,
    /// One entry per head
    pub(crate) sides: Vec<Side>,
    pub(crate) write_protect: bool,
    pub(crate) write_back: bool,
    pub(crate) filename: Option<PathBuf>,
    pub(crate) extras: FormatExtras,
    pub(crate) config: DiskConfig,
    /// Has the disk been modified since load or save?
    pub(crate) changed: bool,
}

impl VirtualDisk {
    /// Create a blank, unformatted disk
    ///
    /// Geometry must be at most 256 cylinders, 1 or 2 heads and an even
    /// track length between 129 and 0x2940 bytes.
    pub fn blank(
        num_cylinders: usize,
        num_heads: usize,
        track_length: usize,
        config: &DiskConfig,
    ) -> Result<Self> {
        if num_cylinders > MAX_CYLINDERS
            || num_heads == 0
            || num_heads > MAX_HEADS
            || track_length < MIN_TRACK_LENGTH
            || track_length > MAX_TRACK_LENGTH
            || track_length % 2 != 0
        {
            return Err(VdiskError::InvalidGeometry {
                cylinders: num_cylinders,
                heads: num_heads,
                track_length,
            });
        }

        let side_len = num_cylinders * track_length;
        let mut sides = Vec::with_capacity(num_heads);
        for head in 0..num_heads {
            sides.push(Side::new(head as u8, side_len)?);
        }

        debug!(
            "New disk: {} cylinders, {} heads, track length {:#06x}",
            num_cylinders, num_heads, track_length
        );

        Ok(Self {
            source_format: DiskFormat::Dmk,
            num_cylinders,
            track_length,
            sides,
            write_protect: false,
            write_back: config.write_back,
            filename: None,
            extras: FormatExtras::default(),
            config: *config,
            changed: false,
        })
    }

    /// Open a disk image, choosing the codec from the file extension
    pub fn open<P: AsRef<Path>>(path: P, config: &DiskConfig) -> Result<Self> {
        crate::io::load(path, config)
    }

    /// Create a new builder for constructing formatted disks
    pub fn builder() -> VirtualDiskBuilder {
        VirtualDiskBuilder::new()
    }

    /// Get the format used for saving
    pub fn format(&self) -> DiskFormat {
        self.source_format
    }

    /// Change the format used for saving
    pub fn set_format(&mut self, format: DiskFormat) {
        self.source_format = format;
    }

    /// Number of cylinders currently allocated
    pub fn num_cylinders(&self) -> usize {
        self.num_cylinders
    }

    /// Number of heads currently allocated
    pub fn num_heads(&self) -> usize {
        self.sides.len()
    }

    /// Raw bytes per track
    pub fn track_length(&self) -> usize {
        self.track_length
    }

    /// Get all sides
    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    /// Configuration this disk was created with
    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// Get the filename if loaded from or saved to disk
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Set the filename used by [`save`](Self::save)
    pub fn set_filename<P: Into<PathBuf>>(&mut self, path: P) {
        self.filename = Some(path.into());
    }

    /// Does the drive refuse writes to this disk?
    pub fn is_write_protected(&self) -> bool {
        self.write_protect
    }

    /// Set the write-protect tab
    pub fn set_write_protect(&mut self, write_protect: bool) {
        self.write_protect = write_protect;
    }

    /// Will changes be persisted by a non-forced save?
    pub fn write_back(&self) -> bool {
        self.write_back
    }

    /// Set the write-back policy
    pub fn set_write_back(&mut self, write_back: bool) {
        self.write_back = write_back;
    }

    /// Was this disk recognised as a headerless OS-9 image?
    pub fn is_headerless_os9(&self) -> bool {
        self.extras.headerless_os9
    }

    /// Format-specific header data
    pub fn extras(&self) -> &FormatExtras {
        &self.extras
    }

    /// Check if the disk has been modified
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mark the disk as unchanged
    pub fn mark_unchanged(&mut self) {
        self.changed = false;
    }

    /// Get the track at (cyl, head) without growing the disk
    pub fn track(&self, cyl: usize, head: usize) -> Option<&[u8]> {
        if cyl >= self.num_cylinders {
            return None;
        }
        self.sides.get(head)?.track(cyl, self.track_length)
    }

    /// Get a mutable reference to the track at (cyl, head) without growing
    pub fn track_mut(&mut self, cyl: usize, head: usize) -> Option<&mut [u8]> {
        if cyl >= self.num_cylinders {
            return None;
        }
        let track_length = self.track_length;
        self.sides.get_mut(head)?.track_mut(cyl, track_length)
    }

    /// Get the track at (cyl, head), growing the disk to include it
    ///
    /// The cylinder count is rounded up to the smallest of 40, 43, 80, 83
    /// or the configured default that covers `cyl`, falling back to
    /// `cyl + 1` past all of them.
    pub fn extend(&mut self, cyl: usize, head: usize) -> Result<&mut [u8]> {
        if cyl >= MAX_CYLINDERS {
            return Err(VdiskError::CylinderLimit {
                cylinder: cyl,
                max: MAX_CYLINDERS,
            });
        }
        if head >= MAX_HEADS {
            return Err(VdiskError::InvalidGeometry {
                cylinders: cyl + 1,
                heads: head + 1,
                track_length: self.track_length,
            });
        }

        let num_cylinders = if cyl >= self.num_cylinders {
            self.grown_cylinders(cyl)
        } else {
            self.num_cylinders
        };
        let num_heads = self.sides.len().max(head + 1);

        if num_cylinders != self.num_cylinders || num_heads != self.sides.len() {
            info!(
                "Extending disk from {}x{} to {}x{}",
                self.num_cylinders,
                self.sides.len(),
                num_cylinders,
                num_heads
            );
            let side_len = num_cylinders * self.track_length;
            for side in &mut self.sides {
                side.grow(side_len)?;
            }
            while self.sides.len() < num_heads {
                let head = self.sides.len() as u8;
                self.sides.push(Side::new(head, side_len)?);
            }
            self.num_cylinders = num_cylinders;
        }

        let track_length = self.track_length;
        self.sides[head]
            .track_mut(cyl, track_length)
            .ok_or(VdiskError::Allocation(num_cylinders * track_length))
    }

    fn grown_cylinders(&self, cyl: usize) -> usize {
        STANDARD_CYLINDERS
            .iter()
            .copied()
            .chain([self.config.default_cylinders])
            .filter(|&n| n > cyl && n <= MAX_CYLINDERS)
            .min()
            .unwrap_or(cyl + 1)
    }

    /// Release all track storage and preserved header data
    pub fn destroy(&mut self) {
        for side in &mut self.sides {
            side.clear();
        }
        self.sides.clear();
        self.num_cylinders = 0;
        self.extras = FormatExtras::default();
    }

    /// Save to the current filename in the current format
    ///
    /// Unless `force` is set, nothing is written when write-back is off.
    pub fn save(&mut self, force: bool) -> Result<()> {
        if !force && !self.write_back {
            info!("Write-back disabled; not saving disk");
            return Ok(());
        }
        let path = self.filename.clone().ok_or(VdiskError::NoFilename)?;
        crate::io::save(self, &path, self.source_format)?;
        self.changed = false;
        Ok(())
    }

    /// Save, asking `requester` for a filename if the disk has none
    pub fn save_with(&mut self, force: bool, requester: &mut dyn FileRequester) -> Result<()> {
        if self.filename.is_none() {
            let path = requester
                .request_save_path(self.source_format)
                .ok_or(VdiskError::NoFilename)?;
            if let Some(format) = DiskFormat::from_path(&path) {
                self.source_format = format;
            }
            self.filename = Some(path);
        }
        self.save(force)
    }

    /// Save to `path`, taking the format from its extension when recognised
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(format) = DiskFormat::from_path(&path) {
            self.source_format = format;
        }
        crate::io::save(self, &path, self.source_format)?;
        self.filename = Some(path);
        self.changed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DiskConfig {
        DiskConfig::default()
    }

    #[test]
    fn test_blank_disk() {
        let disk = VirtualDisk::blank(35, 2, TRACK_LENGTH_5_25, &config()).unwrap();
        assert_eq!(disk.format(), DiskFormat::Dmk);
        assert_eq!(disk.num_cylinders(), 35);
        assert_eq!(disk.num_heads(), 2);
        assert_eq!(disk.sides()[1].len(), 35 * TRACK_LENGTH_5_25);
        assert!(!disk.write_back());
        assert!(!disk.is_changed());

        let disk =
            VirtualDisk::blank(1, 1, TRACK_LENGTH_5_25, &config().with_write_back(true)).unwrap();
        assert!(disk.write_back());
    }

    #[test]
    fn test_blank_disk_rejects_bad_geometry() {
        assert!(VirtualDisk::blank(257, 1, TRACK_LENGTH_5_25, &config()).is_err());
        assert!(VirtualDisk::blank(40, 0, TRACK_LENGTH_5_25, &config()).is_err());
        assert!(VirtualDisk::blank(40, 3, TRACK_LENGTH_5_25, &config()).is_err());
        assert!(VirtualDisk::blank(40, 1, 128, &config()).is_err());
        assert!(VirtualDisk::blank(40, 1, 0x1901, &config()).is_err());
        assert!(VirtualDisk::blank(40, 1, TRACK_LENGTH_8 + 2, &config()).is_err());
        assert!(VirtualDisk::blank(256, 1, TRACK_LENGTH_8, &config()).is_ok());
        assert!(VirtualDisk::blank(0, 1, 130, &config()).is_ok());
    }

    #[test]
    fn test_track_lookup_does_not_grow() {
        let mut disk = VirtualDisk::blank(2, 1, 256, &config()).unwrap();
        assert!(disk.track(1, 0).is_some());
        assert!(disk.track(2, 0).is_none());
        assert!(disk.track(0, 1).is_none());
        assert!(disk.track_mut(2, 0).is_none());
        assert_eq!(disk.num_cylinders(), 2);
    }

    #[test]
    fn test_standard_size_rounding() {
        let mut disk = VirtualDisk::blank(35, 1, 256, &config()).unwrap();
        disk.extend(36, 0).unwrap();
        assert_eq!(disk.num_cylinders(), 40);

        disk.extend(41, 0).unwrap();
        assert_eq!(disk.num_cylinders(), 43);

        disk.extend(50, 0).unwrap();
        assert_eq!(disk.num_cylinders(), 80);

        disk.extend(90, 0).unwrap();
        assert_eq!(disk.num_cylinders(), 91);
    }

    #[test]
    fn test_configured_default_cylinders() {
        let mut disk =
            VirtualDisk::blank(10, 1, 256, &config().with_default_cylinders(35)).unwrap();
        disk.extend(20, 0).unwrap();
        assert_eq!(disk.num_cylinders(), 35);
    }

    #[test]
    fn test_extend_adds_head() {
        let mut disk = VirtualDisk::blank(40, 1, 256, &config()).unwrap();
        disk.extend(3, 1).unwrap()[200] = 0x77;
        assert_eq!(disk.num_heads(), 2);
        assert_eq!(disk.num_cylinders(), 40);
        assert_eq!(disk.sides()[1].len(), 40 * 256);
        assert_eq!(disk.track(3, 1).unwrap()[200], 0x77);
    }

    #[test]
    fn test_extend_preserves_data() {
        let mut disk = VirtualDisk::blank(2, 1, 256, &config()).unwrap();
        disk.track_mut(1, 0).unwrap()[255] = 0xAB;
        disk.extend(60, 1).unwrap();
        assert_eq!(disk.track(1, 0).unwrap()[255], 0xAB);
        assert!(disk.track(59, 0).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_extend_limits() {
        let mut disk = VirtualDisk::blank(40, 1, 256, &config()).unwrap();
        assert!(matches!(
            disk.extend(256, 0),
            Err(VdiskError::CylinderLimit { cylinder: 256, .. })
        ));
        assert!(matches!(
            disk.extend(0, 2),
            Err(VdiskError::InvalidGeometry { .. })
        ));
        assert!(disk.extend(255, 0).is_ok());
        assert_eq!(disk.num_cylinders(), 256);
    }

    #[test]
    fn test_destroy() {
        let mut disk = VirtualDisk::blank(40, 2, 256, &config()).unwrap();
        disk.extras.headerless_os9 = true;
        disk.destroy();
        assert_eq!(disk.num_cylinders(), 0);
        assert_eq!(disk.num_heads(), 0);
        assert!(!disk.is_headerless_os9());
        assert!(disk.track(0, 0).is_none());

        // Safe to repeat
        disk.destroy();
        assert_eq!(disk.num_heads(), 0);
    }

    #[test]
    fn test_save_without_filename() {
        let mut disk = VirtualDisk::blank(1, 1, 256, &config()).unwrap();
        assert!(matches!(disk.save(true), Err(VdiskError::NoFilename)));
        // Write-back off and not forced: nothing to do
        assert!(disk.save(false).is_ok());
    }
}
