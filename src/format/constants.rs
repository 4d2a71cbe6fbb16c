/// Geometry limits, address marks and track layout constants

/// Hard ceiling on the number of cylinders
pub const MAX_CYLINDERS: usize = 256;

/// Maximum number of heads
pub const MAX_HEADS: usize = 2;

/// Bytes reserved at the start of every track for the IDAM table
pub const IDAM_TABLE_SIZE: usize = 128;

/// Number of 16-bit slots in the IDAM table
pub const IDAM_SLOTS: usize = IDAM_TABLE_SIZE / 2;

/// Smallest usable track length
pub const MIN_TRACK_LENGTH: usize = IDAM_TABLE_SIZE + 1;

/// Nominal track length for a 5.25" disk
pub const TRACK_LENGTH_5_25: usize = 0x1900;

/// Nominal track length for an 8" disk
pub const TRACK_LENGTH_8: usize = 0x2940;

/// Largest supported track length
pub const MAX_TRACK_LENGTH: usize = TRACK_LENGTH_8;

/// Cylinder counts a growing disk is rounded up to
pub const STANDARD_CYLINDERS: [usize; 4] = [40, 43, 80, 83];

/// Default "standard" cylinder count
pub const DEFAULT_CYLINDERS: usize = 40;

/// Byte read back from unformatted media, and the format filler
pub const UNFORMATTED_BYTE: u8 = 0xE5;

/// ID address mark
pub const IDAM: u8 = 0xFE;

/// Data address mark
pub const DAM: u8 = 0xFB;

/// Index address mark
pub const IAM: u8 = 0xFC;

/// MFM address mark sync byte (written with a missing clock)
pub const MFM_SYNC: u8 = 0xA1;

/// MFM index mark sync byte
pub const MFM_INDEX_SYNC: u8 = 0xC2;

/// Number of bytes scanned after the ID field for the data address mark
pub const DAM_SEARCH_WINDOW: usize = 43;

/// Largest valid sector size code
pub const MAX_SIZE_CODE: u8 = 3;

/// Convert a sector size code to bytes
///
/// Only codes 0..=3 are meaningful to the controllers this engine serves.
#[inline]
pub fn size_code_to_bytes(size_code: u8) -> Option<usize> {
    if size_code > MAX_SIZE_CODE {
        None
    } else {
        Some(128 << size_code)
    }
}

/// Convert a sector size in bytes to its size code
#[inline]
pub fn bytes_to_size_code(bytes: usize) -> Option<u8> {
    match bytes {
        128 => Some(0),
        256 => Some(1),
        512 => Some(2),
        1024 => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_code_to_bytes() {
        assert_eq!(size_code_to_bytes(0), Some(128));
        assert_eq!(size_code_to_bytes(1), Some(256));
        assert_eq!(size_code_to_bytes(2), Some(512));
        assert_eq!(size_code_to_bytes(3), Some(1024));
        assert_eq!(size_code_to_bytes(4), None);
        assert_eq!(size_code_to_bytes(255), None);
    }

    #[test]
    fn test_bytes_to_size_code() {
        assert_eq!(bytes_to_size_code(256), Some(1));
        assert_eq!(bytes_to_size_code(2048), None);
        assert_eq!(bytes_to_size_code(100), None);
    }

    #[test]
    fn test_round_trip_conversion() {
        for size_code in 0..=MAX_SIZE_CODE {
            let bytes = size_code_to_bytes(size_code).unwrap();
            assert_eq!(bytes_to_size_code(bytes), Some(size_code));
        }
    }

    #[test]
    fn test_idam_table() {
        assert_eq!(IDAM_SLOTS, 64);
        assert_eq!(MIN_TRACK_LENGTH, 129);
    }
}
