/// Loading and saving disk image files

/// DMK raw track dumps
pub mod dmk;
/// JVC raw sector dumps
pub mod jvc;
/// VDK header + sector dumps
pub mod vdk;

pub use dmk::{read_dmk, write_dmk};
pub use jvc::{read_jvc, write_jvc, JvcParams};
pub use vdk::{read_vdk, write_vdk, VdkExtras};

use crate::config::DiskConfig;
use crate::error::{Result, VdiskError};
use crate::format::DiskFormat;
use crate::image::VirtualDisk;
use log::{info, warn};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Supplies a filename when saving a disk that has none
pub trait FileRequester {
    /// Ask for a destination path; `None` cancels the save
    fn request_save_path(&mut self, format: DiskFormat) -> Option<PathBuf>;
}

/// Load a disk image, choosing the codec from the file extension
pub fn load<P: AsRef<Path>>(path: P, config: &DiskConfig) -> Result<VirtualDisk> {
    let path = path.as_ref();
    let format = DiskFormat::from_path(path).ok_or_else(|| {
        warn!("Unrecognised disk image type: {}", path.display());
        VdiskError::invalid_format(format!("Unrecognised disk image type: {}", path.display()))
    })?;

    let mut disk = match format {
        DiskFormat::Vdk => read_vdk(path, config),
        DiskFormat::Jvc => read_jvc(path, config),
        DiskFormat::Dmk => read_dmk(path, config),
    }?;

    info!(
        "Loaded {} image {}: {} cylinders, {} heads",
        format.name(),
        path.display(),
        disk.num_cylinders(),
        disk.num_heads()
    );
    disk.filename = Some(path.to_path_buf());
    disk.changed = false;
    Ok(disk)
}

/// Save a disk image to `path` in `format`
///
/// An existing file is first renamed to `<path>.bak`, unless that backup
/// already exists.
pub fn save<P: AsRef<Path>>(disk: &VirtualDisk, path: P, format: DiskFormat) -> Result<()> {
    let path = path.as_ref();
    backup_existing(path);

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    match format {
        DiskFormat::Vdk => write_vdk(&mut writer, disk)?,
        DiskFormat::Jvc => write_jvc(&mut writer, disk)?,
        DiskFormat::Dmk => write_dmk(&mut writer, disk)?,
    }
    writer.flush()?;

    info!("Saved {} image {}", format.name(), path.display());
    Ok(())
}

/// Path of the backup kept for `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

fn backup_existing(path: &Path) {
    if !path.exists() {
        return;
    }
    let backup = backup_path(path);
    if backup.exists() {
        return;
    }
    if let Err(e) = fs::rename(path, &backup) {
        warn!("Unable to back up {} to {}: {}", path.display(), backup.display(), e);
    }
}

/// Copy `len` bytes at `offset` from `data`, zero-filling past its end.
///
/// Returns false when the copy came up short.
pub(crate) fn read_chunk(data: &[u8], offset: usize, buf: &mut [u8]) -> bool {
    let available = data.get(offset..).unwrap_or(&[]);
    let count = available.len().min(buf.len());
    buf[..count].copy_from_slice(&available[..count]);
    buf[count..].fill(0);
    count == buf.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/tmp/disk.dsk")),
            PathBuf::from("/tmp/disk.dsk.bak")
        );
    }

    #[test]
    fn test_read_chunk() {
        let data = [1u8, 2, 3, 4, 5];
        let mut buf = [0xFFu8; 3];
        assert!(read_chunk(&data, 1, &mut buf));
        assert_eq!(buf, [2, 3, 4]);

        assert!(!read_chunk(&data, 4, &mut buf));
        assert_eq!(buf, [5, 0, 0]);

        assert!(!read_chunk(&data, 10, &mut buf));
        assert_eq!(buf, [0, 0, 0]);
    }

    #[test]
    fn test_load_unknown_extension() {
        let result = load("disk.xyz", &DiskConfig::default());
        assert!(matches!(result, Err(VdiskError::InvalidFormat(_))));
    }

    #[test]
    fn test_backup_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.dmk");
        fs::write(&path, b"original").unwrap();

        let disk = VirtualDisk::builder().num_cylinders(1).build().unwrap();
        save(&disk, &path, DiskFormat::Dmk).unwrap();
        assert_eq!(fs::read(backup_path(&path)).unwrap(), b"original");

        // An existing backup is never overwritten
        save(&disk, &path, DiskFormat::Dmk).unwrap();
        assert_eq!(fs::read(backup_path(&path)).unwrap(), b"original");
    }
}
