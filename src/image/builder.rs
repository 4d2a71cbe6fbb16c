/// Builder for creating formatted virtual disks

use crate::config::DiskConfig;
use crate::error::Result;
use crate::format::constants::TRACK_LENGTH_5_25;
use crate::format::DiskFormat;
use crate::image::VirtualDisk;
use crate::io::jvc::JvcParams;

/// Builder for constructing blank, formatted disks
pub struct VirtualDiskBuilder {
    format: DiskFormat,
    config: DiskConfig,
    num_cylinders: usize,
    num_heads: usize,
    track_length: usize,
    double_density: bool,
    sectors_per_track: usize,
    first_sector: u8,
    size_code: u8,
}

impl VirtualDiskBuilder {
    /// Create a new builder for a single-sided 40-track DragonDOS disk
    pub fn new() -> Self {
        Self {
            format: DiskFormat::Dmk,
            config: DiskConfig::default(),
            num_cylinders: 40,
            num_heads: 1,
            track_length: TRACK_LENGTH_5_25,
            double_density: true,
            sectors_per_track: 18,
            first_sector: 1,
            size_code: 1,
        }
    }

    /// Set the format the disk will be saved as
    pub fn format(mut self, format: DiskFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: DiskConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of cylinders
    pub fn num_cylinders(mut self, num_cylinders: usize) -> Self {
        self.num_cylinders = num_cylinders;
        self
    }

    /// Set the number of heads
    pub fn num_heads(mut self, num_heads: usize) -> Self {
        self.num_heads = num_heads;
        self
    }

    /// Set the raw track length
    pub fn track_length(mut self, track_length: usize) -> Self {
        self.track_length = track_length;
        self
    }

    /// Select MFM (true) or FM (false) recording
    pub fn double_density(mut self, double_density: bool) -> Self {
        self.double_density = double_density;
        self
    }

    /// Set sectors per track
    pub fn sectors_per_track(mut self, sectors_per_track: usize) -> Self {
        self.sectors_per_track = sectors_per_track;
        self
    }

    /// Set the first sector ID
    pub fn first_sector(mut self, first_sector: u8) -> Self {
        self.first_sector = first_sector;
        self
    }

    /// Set the sector size code
    pub fn size_code(mut self, size_code: u8) -> Self {
        self.size_code = size_code;
        self
    }

    /// Build and format the disk
    pub fn build(self) -> Result<VirtualDisk> {
        let mut disk = VirtualDisk::blank(
            self.num_cylinders,
            self.num_heads,
            self.track_length,
            &self.config,
        )?;
        disk.source_format = self.format;
        if self.format == DiskFormat::Jvc {
            disk.extras.jvc = Some(JvcParams::new(
                self.sectors_per_track,
                self.size_code,
                self.first_sector,
            ));
        }

        disk.format_disk(
            self.double_density,
            self.sectors_per_track,
            self.first_sector,
            self.size_code,
        )?;

        // Newly created disk is considered changed
        disk.changed = true;
        Ok(disk)
    }
}

impl Default for VirtualDiskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Idam;

    #[test]
    fn test_builder_default() {
        let disk = VirtualDiskBuilder::new().build().unwrap();

        assert_eq!(disk.format(), DiskFormat::Dmk);
        assert_eq!(disk.num_heads(), 1);
        assert_eq!(disk.num_cylinders(), 40);
        assert!(disk.is_changed());
        assert_eq!(disk.sector_ids(39, 0).len(), 18);
    }

    #[test]
    fn test_builder_custom() {
        let disk = VirtualDiskBuilder::new()
            .format(DiskFormat::Jvc)
            .num_heads(2)
            .num_cylinders(80)
            .sectors_per_track(9)
            .size_code(2)
            .build()
            .unwrap();

        assert_eq!(disk.format(), DiskFormat::Jvc);
        assert_eq!(disk.num_heads(), 2);
        assert_eq!(disk.num_cylinders(), 80);
        let params = disk.extras().jvc.as_ref().unwrap();
        assert_eq!(params.sectors_per_track, 9);
        assert_eq!(params.size_code, 2);

        let ids = disk.sector_ids(79, 1);
        assert_eq!(ids.len(), 9);
        assert!(ids.iter().all(|id| id.size_bytes() == Some(512)));
    }

    #[test]
    fn test_builder_single_density() {
        let disk = VirtualDiskBuilder::new()
            .double_density(false)
            .sectors_per_track(10)
            .num_cylinders(2)
            .build()
            .unwrap();

        let track = disk.track(1, 0).unwrap();
        let idams = Idam::table(track);
        assert_eq!(idams.len(), 10);
        assert!(idams.iter().all(|i| !i.recording_mode().is_double_density()));
    }

    #[test]
    fn test_builder_invalid_geometry() {
        assert!(VirtualDiskBuilder::new().num_heads(3).build().is_err());
        assert!(VirtualDiskBuilder::new().size_code(4).build().is_err());
    }
}
