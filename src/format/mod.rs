/// Interchange formats, geometry constants and interleave tables

/// Format constants
pub mod constants;
/// Sector interleave tables
pub mod interleave;

pub use constants::*;
pub use interleave::Interleave;

use std::path::Path;

/// Disk image interchange format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFormat {
    /// Header + sector dump with fixed 18 × 256-byte tracks
    Vdk,
    /// Raw sector dump with optional short header
    Jvc,
    /// Raw track dump including IDAM tables and gaps
    Dmk,
}

impl DiskFormat {
    /// Classify a file by its extension
    ///
    /// - `.vdk` files are VDK
    /// - `.dsk`, `.jvc` and `.os9` files are JVC
    /// - `.dmk` files are DMK
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<DiskFormat> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "vdk" => Some(DiskFormat::Vdk),
            "dsk" | "jvc" | "os9" => Some(DiskFormat::Jvc),
            "dmk" => Some(DiskFormat::Dmk),
            _ => None,
        }
    }

    /// Get the magic bytes for this format
    pub fn magic_bytes(&self) -> &'static [u8] {
        match self {
            DiskFormat::Vdk => b"dk",
            DiskFormat::Jvc => &[], // JVC has no magic bytes
            DiskFormat::Dmk => &[],
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            DiskFormat::Vdk => "VDK",
            DiskFormat::Jvc => "JVC",
            DiskFormat::Dmk => "DMK",
        }
    }

    /// Preferred file extension
    pub fn extension(&self) -> &'static str {
        match self {
            DiskFormat::Vdk => "vdk",
            DiskFormat::Jvc => "dsk",
            DiskFormat::Dmk => "dmk",
        }
    }
}

/// True when the path names an OS-9 sector dump, which forces OS-9 probing
pub fn is_os9_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("os9"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(DiskFormat::from_path("disk.vdk"), Some(DiskFormat::Vdk));
        assert_eq!(DiskFormat::from_path("DISK.DSK"), Some(DiskFormat::Jvc));
        assert_eq!(DiskFormat::from_path("/path/to/nitros9.os9"), Some(DiskFormat::Jvc));
        assert_eq!(DiskFormat::from_path("disk.jvc"), Some(DiskFormat::Jvc));
        assert_eq!(DiskFormat::from_path("disk.Dmk"), Some(DiskFormat::Dmk));
        assert_eq!(DiskFormat::from_path("disk.txt"), None);
        assert_eq!(DiskFormat::from_path("disk"), None);
    }

    #[test]
    fn test_is_os9_file() {
        assert!(is_os9_file("boot.os9"));
        assert!(is_os9_file("BOOT.OS9"));
        assert!(!is_os9_file("boot.dsk"));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(DiskFormat::Vdk.magic_bytes(), b"dk");
        assert_eq!(DiskFormat::Dmk.name(), "DMK");
        assert_eq!(DiskFormat::Jvc.extension(), "dsk");
    }
}
