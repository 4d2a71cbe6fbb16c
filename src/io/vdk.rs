/// VDK image reader and writer
///
/// A VDK file is a 12-byte header, optional extra header bytes, then
/// 256-byte sectors in cylinder, head, sector order. Every track holds 18
/// double-density sectors numbered from 1.

use crate::config::DiskConfig;
use crate::error::{Result, VdiskError};
use crate::format::constants::TRACK_LENGTH_5_25;
use crate::format::DiskFormat;
use crate::image::VirtualDisk;
use crate::io::read_chunk;
use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Fixed part of the header
pub const VDK_HEADER_SIZE: usize = 12;
/// Header version written to new files
pub const VDK_VERSION: u8 = 0x10;
/// Source id written to new files
pub const VDK_SOURCE_ID: u8 = b'V';
/// Sectors on every VDK track
pub const VDK_SECTORS_PER_TRACK: usize = 18;
/// Bytes in every VDK sector
pub const VDK_SECTOR_SIZE: usize = 256;

const FLAG_WRITE_PROTECT: u8 = 0x01;
const COMPRESSION_MASK: u8 = 0x07;

/// VDK header fields that survive a load/save cycle untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VdkExtras {
    /// Length of the disk name, from the top five bits of byte 11
    pub name_length: u8,
    /// Header bytes beyond the fixed 12
    pub extra: Vec<u8>,
}

/// Read a VDK file from disk
pub fn read_vdk<P: AsRef<Path>>(path: P, config: &DiskConfig) -> Result<VirtualDisk> {
    let data = fs::read(path)?;
    load_vdk(&data, config)
}

/// Parse an in-memory VDK image
pub fn load_vdk(data: &[u8], config: &DiskConfig) -> Result<VirtualDisk> {
    if data.len() < VDK_HEADER_SIZE || &data[0..2] != DiskFormat::Vdk.magic_bytes() {
        warn!("Not a VDK image");
        return Err(VdiskError::invalid_format("Missing VDK signature"));
    }

    let header_len = u16::from_le_bytes([data[2], data[3]]) as usize;
    if header_len < VDK_HEADER_SIZE {
        warn!("VDK header length {} too short", header_len);
        return Err(VdiskError::parse(2, format!("Header length {} too short", header_len)));
    }
    if header_len > data.len() {
        warn!("VDK header length {} exceeds file size", header_len);
        return Err(VdiskError::parse(2, "Header extends past end of file"));
    }

    let num_cylinders = data[8] as usize;
    let num_heads = data[9] as usize;
    let flags = data[10];
    let compression = data[11] & COMPRESSION_MASK;
    if compression != 0 {
        warn!("Compressed VDK images are not supported");
        return Err(VdiskError::unsupported(format!(
            "VDK compression mode {}",
            compression
        )));
    }
    if num_heads == 0 || num_heads > 2 {
        return Err(VdiskError::InvalidGeometry {
            cylinders: num_cylinders,
            heads: num_heads,
            track_length: TRACK_LENGTH_5_25,
        });
    }

    let mut disk = VirtualDisk::blank(num_cylinders, num_heads, TRACK_LENGTH_5_25, config)?;
    disk.format_disk(true, VDK_SECTORS_PER_TRACK, 1, 1)?;

    let body = &data[header_len..];
    let mut buf = [0u8; VDK_SECTOR_SIZE];
    let mut offset = 0;
    let mut short = false;
    for cyl in 0..num_cylinders {
        for head in 0..num_heads {
            for sector in 1..=VDK_SECTORS_PER_TRACK {
                if !read_chunk(body, offset, &mut buf) && !short {
                    warn!(
                        "VDK image truncated at cylinder {} head {} sector {}",
                        cyl, head, sector
                    );
                    short = true;
                }
                disk.update_sector(cyl as u8, head as u8, sector as u8, &buf)?;
                offset += VDK_SECTOR_SIZE;
            }
        }
    }

    debug!(
        "VDK header: version {:#04x}, source {:#04x}/{:#04x}, {} extra bytes",
        data[4],
        data[6],
        data[7],
        header_len - VDK_HEADER_SIZE
    );

    disk.source_format = DiskFormat::Vdk;
    disk.write_protect = flags & FLAG_WRITE_PROTECT != 0;
    disk.extras.vdk = Some(VdkExtras {
        name_length: data[11] >> 3,
        extra: data[VDK_HEADER_SIZE..header_len].to_vec(),
    });
    disk.changed = false;
    Ok(disk)
}

/// Write a disk as a VDK image
///
/// Sectors that cannot be read back are written as unformatted media.
pub fn write_vdk<W: Write>(writer: &mut W, disk: &VirtualDisk) -> Result<()> {
    let num_cylinders = disk.num_cylinders();
    if num_cylinders > u8::MAX as usize {
        return Err(VdiskError::CylinderLimit {
            cylinder: num_cylinders,
            max: u8::MAX as usize,
        });
    }
    let num_heads = disk.num_heads();
    let extras = disk.extras().vdk.clone().unwrap_or_default();
    let header_len = VDK_HEADER_SIZE + extras.extra.len();
    let header_len = u16::try_from(header_len)
        .map_err(|_| VdiskError::invalid_format("VDK extra header too long"))?;

    let mut header = [0u8; VDK_HEADER_SIZE];
    header[0..2].copy_from_slice(DiskFormat::Vdk.magic_bytes());
    header[2..4].copy_from_slice(&header_len.to_le_bytes());
    header[4] = VDK_VERSION;
    header[5] = VDK_VERSION;
    header[6] = VDK_SOURCE_ID;
    header[8] = num_cylinders as u8;
    header[9] = num_heads as u8;
    if disk.is_write_protected() {
        header[10] |= FLAG_WRITE_PROTECT;
    }
    header[11] = extras.name_length << 3;
    writer.write_all(&header)?;
    writer.write_all(&extras.extra)?;

    let mut buf = [0u8; VDK_SECTOR_SIZE];
    for cyl in 0..num_cylinders {
        for head in 0..num_heads {
            for sector in 1..=VDK_SECTORS_PER_TRACK {
                if let Err(e) = disk.fetch_sector(cyl as u8, head as u8, sector as u8, &mut buf) {
                    debug!("VDK save: {}", e);
                }
                writer.write_all(&buf)?;
            }
        }
    }
    Ok(())
}
