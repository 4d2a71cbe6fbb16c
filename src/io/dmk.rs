/// DMK image reader and writer
///
/// DMK files hold complete raw tracks, IDAM table included, so tracks are
/// copied verbatim in both directions.

use crate::config::DiskConfig;
use crate::error::{Result, VdiskError};
use crate::format::DiskFormat;
use crate::image::VirtualDisk;
use crate::io::read_chunk;
use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::Path;

/// DMK header size
pub const DMK_HEADER_SIZE: usize = 16;
/// Header byte 0 value for a disk whose changes are not written back
pub const DMK_WRITE_DISABLED: u8 = 0xFF;
/// Header byte 11 value for a write-protected disk
pub const DMK_WRITE_PROTECTED: u8 = 0xFF;
/// Bytes 12..16 of a descriptor for a real drive rather than an image
pub const DMK_REAL_DRIVE: u32 = 0x1234_5678;

/// Options bit: single-sided
pub const OPT_SINGLE_SIDED: u8 = 0x10;
/// Options bit: single density only, one byte per FM cell
pub const OPT_SINGLE_DENSITY: u8 = 0x40;

/// Read a DMK file from disk
pub fn read_dmk<P: AsRef<Path>>(path: P, config: &DiskConfig) -> Result<VirtualDisk> {
    let data = fs::read(path)?;
    load_dmk(&data, config)
}

/// Parse an in-memory DMK image
pub fn load_dmk(data: &[u8], config: &DiskConfig) -> Result<VirtualDisk> {
    if data.len() < DMK_HEADER_SIZE {
        warn!("DMK image too short for header");
        return Err(VdiskError::invalid_format("DMK header truncated"));
    }
    let header = &data[..DMK_HEADER_SIZE];

    let signature = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);
    if signature == DMK_REAL_DRIVE {
        warn!("DMK descriptor refers to a real drive");
        return Err(VdiskError::unsupported("DMK real-drive descriptor"));
    }

    let options = header[4];
    if options & OPT_SINGLE_DENSITY != 0 {
        warn!("Single-density-only DMK images are not supported");
        return Err(VdiskError::unsupported("DMK single-density-only image"));
    }

    let num_cylinders = header[1] as usize;
    let track_length = u16::from_le_bytes([header[2], header[3]]) as usize;
    let num_heads = if options & OPT_SINGLE_SIDED != 0 { 1 } else { 2 };
    debug!(
        "DMK header: {} cylinders, {} heads, track length {:#06x}, options {:#04x}",
        num_cylinders, num_heads, track_length, options
    );

    let mut disk = VirtualDisk::blank(num_cylinders, num_heads, track_length, config)
        .inspect_err(|e| warn!("Bad DMK geometry: {}", e))?;

    let body = &data[DMK_HEADER_SIZE..];
    let mut offset = 0;
    let mut short = false;
    for cyl in 0..num_cylinders {
        for head in 0..num_heads {
            let track = disk
                .track_mut(cyl, head)
                .ok_or(VdiskError::TrackNotFound {
                    cylinder: cyl as u8,
                    head: head as u8,
                })?;
            if !read_chunk(body, offset, track) && !short {
                warn!("DMK image truncated at cylinder {} head {}", cyl, head);
                short = true;
            }
            offset += track_length;
        }
    }

    disk.source_format = DiskFormat::Dmk;
    disk.write_back = header[0] != DMK_WRITE_DISABLED;
    disk.write_protect = header[11] == DMK_WRITE_PROTECTED;
    disk.changed = false;
    Ok(disk)
}

/// Write a disk as a DMK image
pub fn write_dmk<W: Write>(writer: &mut W, disk: &VirtualDisk) -> Result<()> {
    let num_cylinders = disk.num_cylinders();
    if num_cylinders > u8::MAX as usize {
        return Err(VdiskError::CylinderLimit {
            cylinder: num_cylinders,
            max: u8::MAX as usize,
        });
    }
    let track_length = disk.track_length();

    let mut header = [0u8; DMK_HEADER_SIZE];
    if !disk.write_back() {
        header[0] = DMK_WRITE_DISABLED;
    }
    header[1] = num_cylinders as u8;
    header[2..4].copy_from_slice(&(track_length as u16).to_le_bytes());
    if disk.num_heads() == 1 {
        header[4] |= OPT_SINGLE_SIDED;
    }
    if disk.is_write_protected() {
        header[11] = DMK_WRITE_PROTECTED;
    }
    writer.write_all(&header)?;

    for cyl in 0..num_cylinders {
        for head in 0..disk.num_heads() {
            let track = disk.track(cyl, head).ok_or(VdiskError::TrackNotFound {
                cylinder: cyl as u8,
                head: head as u8,
            })?;
            writer.write_all(track)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::constants::TRACK_LENGTH_5_25;

    fn header(ncyls: u8, track_length: u16, options: u8) -> Vec<u8> {
        let mut h = vec![0u8; DMK_HEADER_SIZE];
        h[1] = ncyls;
        h[2..4].copy_from_slice(&track_length.to_le_bytes());
        h[4] = options;
        h
    }

    #[test]
    fn test_tracks_copied_verbatim() {
        let mut data = header(2, 256, 0);
        for t in 0..4u8 {
            data.extend(std::iter::repeat(t).take(256));
        }

        let disk = load_dmk(&data, &DiskConfig::default()).unwrap();
        assert_eq!(disk.format(), DiskFormat::Dmk);
        assert_eq!(disk.num_heads(), 2);
        assert_eq!(disk.num_cylinders(), 2);
        // Cylinder-major, then head
        assert!(disk.track(0, 1).unwrap().iter().all(|&b| b == 1));
        assert!(disk.track(1, 0).unwrap().iter().all(|&b| b == 2));
        assert!(disk.write_back());
        assert!(!disk.is_write_protected());

        let mut out = Vec::new();
        write_dmk(&mut out, &disk).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_header_flags() {
        let mut data = header(1, 256, OPT_SINGLE_SIDED);
        data[0] = DMK_WRITE_DISABLED;
        data[11] = DMK_WRITE_PROTECTED;
        data.extend(vec![0x4E; 256]);

        let disk = load_dmk(&data, &DiskConfig::default().with_write_back(true)).unwrap();
        assert_eq!(disk.num_heads(), 1);
        assert!(!disk.write_back());
        assert!(disk.is_write_protected());

        let mut out = Vec::new();
        write_dmk(&mut out, &disk).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_unsupported_images() {
        let mut data = header(1, 256, OPT_SINGLE_DENSITY);
        data.extend(vec![0; 512]);
        assert!(matches!(
            load_dmk(&data, &DiskConfig::default()),
            Err(VdiskError::UnsupportedFormat(_))
        ));

        let mut data = header(1, 256, 0);
        data[12..16].copy_from_slice(&DMK_REAL_DRIVE.to_le_bytes());
        assert!(matches!(
            load_dmk(&data, &DiskConfig::default()),
            Err(VdiskError::UnsupportedFormat(_))
        ));

        assert!(load_dmk(&[0u8; 10], &DiskConfig::default()).is_err());
        assert!(matches!(
            load_dmk(&header(1, 0x3000, 0), &DiskConfig::default()),
            Err(VdiskError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_truncated_tracks_zero_filled() {
        let mut data = header(40, TRACK_LENGTH_5_25 as u16, OPT_SINGLE_SIDED);
        data.extend(vec![0x4E; 100]);

        let disk = load_dmk(&data, &DiskConfig::default()).unwrap();
        assert_eq!(disk.num_cylinders(), 40);
        let track = disk.track(0, 0).unwrap();
        assert!(track[..100].iter().all(|&b| b == 0x4E));
        assert!(track[100..].iter().all(|&b| b == 0));
        assert!(disk.track(39, 0).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_formatted_disk_survives() {
        let mut disk = VirtualDisk::builder().num_cylinders(3).build().unwrap();
        disk.update_sector(2, 0, 7, &[0x5A; 256]).unwrap();

        let mut out = Vec::new();
        write_dmk(&mut out, &disk).unwrap();
        let loaded = load_dmk(&out, &DiskConfig::default()).unwrap();

        let mut buf = [0u8; 256];
        loaded.fetch_sector(2, 0, 7, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0x5A));
        assert_eq!(loaded.sector_ids(1, 0), disk.sector_ids(1, 0));
    }
}
