/// JVC image reader and writer
///
/// A JVC file is a raw dump of sector data, optionally preceded by a short
/// header whose length is the file size modulo 128. Each header byte that is
/// present overrides a default: sectors per track, heads, size code, first
/// sector id and the attribute flag.

use crate::config::DiskConfig;
use crate::error::{Result, VdiskError};
use crate::format::constants::*;
use crate::format::{is_os9_file, DiskFormat};
use crate::image::{RecordingMode, TrackLayout, VirtualDisk};
use crate::io::read_chunk;
use log::{debug, info, warn};
use std::fs;
use std::io::Write;
use std::path::Path;

/// The header length is the file size modulo this
pub const JVC_HEADER_MODULUS: usize = 128;
/// Largest number of sectors a JVC track may declare
pub const JVC_MAX_SECTORS: usize = IDAM_SLOTS;
/// Single-sided images with at least this many cylinders are read as double-sided
pub const JVC_DOUBLE_SIDED_THRESHOLD: usize = 88;

const DEFAULT_SECTORS_PER_TRACK: usize = 18;
const DEFAULT_SIZE_CODE: u8 = 1;
const DEFAULT_FIRST_SECTOR: u8 = 1;

/// OS-9 identification sector field offsets
const DD_TOT: usize = 0x00;
const DD_TKS: usize = 0x03;
const DD_FMT: usize = 0x10;
const OS9_SECTOR_SIZE: usize = 256;

/// Geometry of a JVC image, kept so it can be saved the way it was loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JvcParams {
    /// Sectors on every track
    pub sectors_per_track: usize,
    /// Sector size code (0..=3)
    pub size_code: u8,
    /// ID of the first sector on each track
    pub first_sector: u8,
    /// Each sector is preceded by one attribute byte
    pub attributes: bool,
    /// Raw header as loaded
    pub header: Vec<u8>,
}

impl JvcParams {
    /// Parameters with no header bytes and no attribute bytes
    pub fn new(sectors_per_track: usize, size_code: u8, first_sector: u8) -> Self {
        Self {
            sectors_per_track,
            size_code,
            first_sector,
            attributes: false,
            header: Vec::new(),
        }
    }

    /// Bytes stored per sector, including the attribute byte
    fn stored_sector_size(&self) -> usize {
        size_code_to_bytes(self.size_code).unwrap_or(0) + self.attributes as usize
    }

    /// Shortest header that can express these parameters for `num_heads`
    /// heads and `num_cylinders` cylinders
    pub fn minimum_header_length(&self, num_heads: usize, num_cylinders: usize) -> usize {
        if self.attributes {
            5
        } else if self.first_sector != DEFAULT_FIRST_SECTOR {
            4
        } else if self.size_code != DEFAULT_SIZE_CODE {
            3
        } else if num_heads != 1 || num_cylinders >= JVC_DOUBLE_SIDED_THRESHOLD {
            2
        } else if self.sectors_per_track != DEFAULT_SECTORS_PER_TRACK {
            1
        } else {
            0
        }
    }
}

impl Default for JvcParams {
    fn default() -> Self {
        Self::new(DEFAULT_SECTORS_PER_TRACK, DEFAULT_SIZE_CODE, DEFAULT_FIRST_SECTOR)
    }
}

/// Probe a headerless sector dump for an OS-9 identification sector
///
/// Returns `(sectors_per_track, heads)` when the total sector count is
/// consistent with both the track geometry and the data size.
pub fn detect_os9(body: &[u8]) -> Option<(usize, usize)> {
    let id = body.get(..OS9_SECTOR_SIZE)?;
    let total = u32::from_be_bytes([0, id[DD_TOT], id[DD_TOT + 1], id[DD_TOT + 2]]) as usize;
    let sectors_per_track = id[DD_TKS] as usize;
    let heads = if id[DD_FMT] & 0x01 != 0 { 2 } else { 1 };

    if sectors_per_track == 0
        || total % (sectors_per_track * heads) != 0
        || total * OS9_SECTOR_SIZE != body.len()
    {
        return None;
    }
    Some((sectors_per_track, heads))
}

/// Read a JVC file from disk
///
/// Files with an `.os9` extension are always probed for an OS-9 header.
pub fn read_jvc<P: AsRef<Path>>(path: P, config: &DiskConfig) -> Result<VirtualDisk> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    load_jvc(&data, config, is_os9_file(path))
}

/// Parse an in-memory JVC image
pub fn load_jvc(data: &[u8], config: &DiskConfig, probe_os9: bool) -> Result<VirtualDisk> {
    if data.is_empty() {
        warn!("Empty JVC image");
        return Err(VdiskError::invalid_format("Empty JVC image"));
    }

    let header_len = data.len() % JVC_HEADER_MODULUS;
    let header = &data[..header_len];
    let body = &data[header_len..];

    let mut params = JvcParams::default();
    let mut heads = header.get(1).map(|&h| h as usize);
    if let Some(&spt) = header.first() {
        params.sectors_per_track = spt as usize;
    }
    if let Some(&code) = header.get(2) {
        params.size_code = code;
    }
    if let Some(&first) = header.get(3) {
        params.first_sector = first;
    }
    if let Some(&attr) = header.get(4) {
        params.attributes = attr != 0;
    }
    params.header = header.to_vec();

    let mut headerless_os9 = false;
    if header_len == 0 && (config.auto_os9 || probe_os9) {
        if let Some((spt, sides)) = detect_os9(body) {
            info!("OS-9 filesystem detected: {} sectors/track, {} sides", spt, sides);
            params.sectors_per_track = spt;
            heads = Some(sides);
            headerless_os9 = true;
        }
    }

    if params.sectors_per_track == 0 || params.sectors_per_track > JVC_MAX_SECTORS {
        warn!("Bad JVC sectors per track: {}", params.sectors_per_track);
        return Err(VdiskError::parse(
            0,
            format!("Bad sectors per track: {}", params.sectors_per_track),
        ));
    }
    let sector_size = size_code_to_bytes(params.size_code).ok_or_else(|| {
        warn!("Bad JVC sector size code: {}", params.size_code);
        VdiskError::InvalidSizeCode(params.size_code)
    })?;
    if let Some(h) = heads {
        if h == 0 || h > MAX_HEADS {
            warn!("Bad JVC head count: {}", h);
            return Err(VdiskError::parse(1, format!("Bad head count: {}", h)));
        }
    }

    let track_bytes = params.sectors_per_track * params.stored_sector_size();
    let mut num_heads = heads.unwrap_or(1);
    let mut num_cylinders = body.len().div_ceil(track_bytes * num_heads);
    if heads.is_none() && num_cylinders >= JVC_DOUBLE_SIDED_THRESHOLD {
        num_heads = 2;
        num_cylinders = body.len().div_ceil(track_bytes * num_heads);
        debug!("Large headerless JVC read as {} cylinders double-sided", num_cylinders);
    }
    if num_cylinders > MAX_CYLINDERS {
        warn!("JVC image has too many cylinders: {}", num_cylinders);
        return Err(VdiskError::CylinderLimit {
            cylinder: num_cylinders,
            max: MAX_CYLINDERS,
        });
    }

    let track_length = TrackLayout::track_length_for(
        RecordingMode::MFM,
        params.sectors_per_track,
        sector_size,
    )
    .max(TRACK_LENGTH_5_25);
    if track_length > MAX_TRACK_LENGTH {
        warn!(
            "JVC track of {} x {} bytes does not fit a raw track",
            params.sectors_per_track, sector_size
        );
        return Err(VdiskError::InvalidGeometry {
            cylinders: num_cylinders,
            heads: num_heads,
            track_length,
        });
    }

    let mut disk = VirtualDisk::blank(num_cylinders, num_heads, track_length, config)?;
    disk.format_disk(
        true,
        params.sectors_per_track,
        params.first_sector,
        params.size_code,
    )?;

    let mut buf = vec![0u8; sector_size];
    let mut offset = 0;
    let mut short = false;
    for cyl in 0..num_cylinders {
        for head in 0..num_heads {
            for index in 0..params.sectors_per_track {
                // Attribute byte is ignored
                offset += params.attributes as usize;
                if !read_chunk(body, offset, &mut buf) && !short {
                    debug!("JVC data ends within cylinder {} head {}", cyl, head);
                    short = true;
                }
                let sector = params.first_sector.wrapping_add(index as u8);
                disk.update_sector(cyl as u8, head as u8, sector, &buf)?;
                offset += sector_size;
            }
        }
    }

    disk.source_format = DiskFormat::Jvc;
    disk.extras.jvc = Some(params);
    disk.extras.headerless_os9 = headerless_os9;
    disk.changed = false;
    Ok(disk)
}

/// Write a disk as a JVC image
///
/// The header is omitted for headerless OS-9 images. Otherwise it is as
/// long as it was when loaded, or as long as needed to describe the
/// geometry, whichever is greater.
pub fn write_jvc<W: Write>(writer: &mut W, disk: &VirtualDisk) -> Result<()> {
    let params = disk.extras().jvc.clone().unwrap_or_default();
    let sector_size =
        size_code_to_bytes(params.size_code).ok_or(VdiskError::InvalidSizeCode(params.size_code))?;
    let num_cylinders = disk.num_cylinders();
    let num_heads = disk.num_heads();

    if !disk.is_headerless_os9() {
        let header_len = params
            .header
            .len()
            .max(params.minimum_header_length(num_heads, num_cylinders));
        let mut header = params.header.clone();
        header.resize(header_len, 0);
        let fields = [
            params.sectors_per_track as u8,
            num_heads as u8,
            params.size_code,
            params.first_sector,
            params.attributes as u8,
        ];
        for (byte, field) in header.iter_mut().zip(fields) {
            *byte = field;
        }
        writer.write_all(&header)?;
    }

    let mut buf = vec![0u8; sector_size];
    for cyl in 0..num_cylinders {
        for head in 0..num_heads {
            for index in 0..params.sectors_per_track {
                if params.attributes {
                    writer.write_all(&[0])?;
                }
                let sector = params.first_sector.wrapping_add(index as u8);
                if let Err(e) = disk.fetch_sector(cyl as u8, head as u8, sector, &mut buf) {
                    debug!("JVC save: {}", e);
                }
                writer.write_all(&buf)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DiskConfig {
        DiskConfig::default()
    }

    fn sectors(count: usize, size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(count * size);
        for i in 0..count {
            // First byte stays zero so no OS-9 header is mistaken
            data.push(0);
            data.extend(std::iter::repeat((i % 251) as u8 + 1).take(size - 1));
        }
        data
    }

    fn os9_body(total: usize, tks: u8, double_sided: bool) -> Vec<u8> {
        let mut body = vec![0u8; total * 256];
        body[0..3].copy_from_slice(&(total as u32).to_be_bytes()[1..]);
        body[DD_TKS] = tks;
        body[DD_FMT] = double_sided as u8;
        body
    }

    #[test]
    fn test_headerless_defaults() {
        let disk = load_jvc(&sectors(35 * 18, 256), &config(), false).unwrap();
        assert_eq!(disk.format(), DiskFormat::Jvc);
        assert_eq!(disk.num_cylinders(), 35);
        assert_eq!(disk.num_heads(), 1);
        assert_eq!(disk.track_length(), TRACK_LENGTH_5_25);

        let mut buf = [0u8; 256];
        disk.fetch_sector(2, 0, 5, &mut buf).unwrap();
        assert_eq!(buf[1], (2 * 18 + 4) as u8 + 1);
    }

    #[test]
    fn test_header_overrides() {
        // 10 sectors of 512 bytes, 2 heads, first sector 0
        let mut data = vec![10, 2, 2, 0];
        data.extend(sectors(3 * 2 * 10, 512));

        let disk = load_jvc(&data, &config(), false).unwrap();
        assert_eq!(disk.num_cylinders(), 3);
        assert_eq!(disk.num_heads(), 2);

        let ids = disk.sector_ids(0, 1);
        assert_eq!(ids.len(), 10);
        assert!(ids.iter().all(|id| id.size_bytes() == Some(512)));
        assert!(ids.iter().any(|id| id.sector == 0));

        let params = disk.extras().jvc.as_ref().unwrap();
        assert_eq!(params.first_sector, 0);
        assert_eq!(params.header, vec![10, 2, 2, 0]);

        let mut out = Vec::new();
        write_jvc(&mut out, &disk).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_attribute_bytes_skipped() {
        // 128 sectors of 257 bytes keep the body a multiple of 128
        let mut data = vec![16, 1, 1, 1, 0xFF];
        for i in 0..128u8 {
            data.push(0xAA);
            data.extend(std::iter::repeat(i).take(256));
        }

        let disk = load_jvc(&data, &config(), false).unwrap();
        assert_eq!(disk.num_cylinders(), 8);
        let mut buf = [0u8; 256];
        disk.fetch_sector(0, 0, 4, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 3));
        disk.fetch_sector(7, 0, 16, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 127));

        let mut out = Vec::new();
        write_jvc(&mut out, &disk).unwrap();
        assert_eq!(&out[..5], &[16, 1, 1, 1, 1]);
        assert_eq!(out[5], 0);
        assert_eq!(out.len(), data.len());
    }

    #[test]
    fn test_large_single_sided_is_double_sided() {
        let disk = load_jvc(&sectors(88 * 18, 256), &config(), false).unwrap();
        assert_eq!(disk.num_heads(), 2);
        assert_eq!(disk.num_cylinders(), 44);

        // A header naming one head is honoured
        let mut data = vec![18, 1];
        data.extend(sectors(88 * 18, 256));
        let disk = load_jvc(&data, &config(), false).unwrap();
        assert_eq!(disk.num_heads(), 1);
        assert_eq!(disk.num_cylinders(), 88);

        // and written back with the head count
        let mut out = Vec::new();
        write_jvc(&mut out, &disk).unwrap();
        assert_eq!(&out[..2], &[18, 1]);
    }

    #[test]
    fn test_detect_os9() {
        assert_eq!(detect_os9(&os9_body(720, 18, false)), Some((18, 1)));
        assert_eq!(detect_os9(&os9_body(1440, 18, true)), Some((18, 2)));
        // Total not a multiple of the track size
        assert_eq!(detect_os9(&os9_body(721, 18, false)), None);
        assert_eq!(detect_os9(&os9_body(720, 0, false)), None);

        let mut body = os9_body(720, 18, false);
        body.truncate(719 * 256);
        assert_eq!(detect_os9(&body), None);
        assert_eq!(detect_os9(&[0u8; 100]), None);
    }

    #[test]
    fn test_os9_geometry_and_headerless_save() {
        let body = os9_body(2 * 40 * 9, 9, true);
        let disk = load_jvc(&body, &config(), false).unwrap();
        assert!(disk.is_headerless_os9());
        assert_eq!(disk.num_heads(), 2);
        assert_eq!(disk.num_cylinders(), 40);
        assert_eq!(disk.extras().jvc.as_ref().unwrap().sectors_per_track, 9);

        let mut out = Vec::new();
        write_jvc(&mut out, &disk).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn test_os9_probe_respects_config() {
        let body = os9_body(40 * 9, 9, false);
        let no_probe = config().with_auto_os9(false);

        let disk = load_jvc(&body, &no_probe, false).unwrap();
        assert!(!disk.is_headerless_os9());
        assert_eq!(disk.extras().jvc.as_ref().unwrap().sectors_per_track, 18);

        let disk = load_jvc(&body, &no_probe, true).unwrap();
        assert!(disk.is_headerless_os9());
    }

    #[test]
    fn test_minimum_header_length() {
        let params = JvcParams::default();
        assert_eq!(params.minimum_header_length(1, 40), 0);
        assert_eq!(params.minimum_header_length(2, 40), 2);
        assert_eq!(params.minimum_header_length(1, 88), 2);
        assert_eq!(JvcParams::new(9, 1, 1).minimum_header_length(1, 40), 1);
        assert_eq!(JvcParams::new(18, 2, 1).minimum_header_length(1, 40), 3);
        assert_eq!(JvcParams::new(18, 1, 0).minimum_header_length(1, 40), 4);
    }

    #[test]
    fn test_bad_images() {
        assert!(matches!(
            load_jvc(&[], &config(), false),
            Err(VdiskError::InvalidFormat(_))
        ));

        let mut data = vec![0];
        data.extend(vec![0; 256]);
        assert!(load_jvc(&data, &config(), false).is_err());

        let mut data = vec![18, 3];
        data.extend(vec![0; 256]);
        assert!(load_jvc(&data, &config(), false).is_err());

        let mut data = vec![18, 1, 4];
        data.extend(vec![0; 256]);
        assert!(matches!(
            load_jvc(&data, &config(), false),
            Err(VdiskError::InvalidSizeCode(4))
        ));

        // 64 sectors of 1024 bytes cannot fit a raw track
        let mut data = vec![64, 1, 3];
        data.extend(vec![0; 1024]);
        assert!(matches!(
            load_jvc(&data, &config(), false),
            Err(VdiskError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_partial_last_track() {
        let data = sectors(18 + 2, 256);
        let disk = load_jvc(&data, &config(), false).unwrap();
        assert_eq!(disk.num_cylinders(), 2);

        let mut buf = [0xFFu8; 256];
        disk.fetch_sector(1, 0, 2, &mut buf).unwrap();
        assert_eq!(buf[1], 20);
        disk.fetch_sector(1, 0, 3, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }
}
