use thiserror::Error;

/// Result type alias for virtual disk operations
pub type Result<T> = std::result::Result<T, VdiskError>;

/// Errors that can occur when working with virtual disks
#[derive(Debug, Error)]
pub enum VdiskError {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unrecognized disk image
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Recognized image using a feature this engine does not support
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Error message
        message: String,
    },

    /// Geometry outside the representable range
    #[error("Invalid geometry: {cylinders} cylinders, {heads} heads, track length {track_length}")]
    InvalidGeometry {
        /// Requested cylinder count
        cylinders: usize,
        /// Requested head count
        heads: usize,
        /// Requested track length in bytes
        track_length: usize,
    },

    /// Cylinder beyond the hard ceiling
    #[error("Cylinder {cylinder} exceeds limit of {max} cylinders")]
    CylinderLimit {
        /// Requested cylinder
        cylinder: usize,
        /// Maximum cylinder count
        max: usize,
    },

    /// Track buffer could not be allocated
    #[error("Unable to allocate {0} bytes of track storage")]
    Allocation(usize),

    /// Track not present in the current geometry
    #[error("Track not found: cylinder {cylinder}, head {head}")]
    TrackNotFound {
        /// Cylinder number
        cylinder: u8,
        /// Head number
        head: u8,
    },

    /// No ID address mark matched the requested sector
    #[error("Sector not found: cylinder {cylinder}, head {head}, sector {sector}")]
    SectorNotFound {
        /// Cylinder number
        cylinder: u8,
        /// Head number
        head: u8,
        /// Sector ID
        sector: u8,
    },

    /// Sector size code outside 0..=3
    #[error("Invalid sector size code {0}")]
    InvalidSizeCode(u8),

    /// Save requested for a disk with no filename
    #[error("Disk has no filename")]
    NoFilename,
}

impl VdiskError {
    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: usize, message: S) -> Self {
        VdiskError::ParseError {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        VdiskError::InvalidFormat(message.into())
    }

    /// Create an unsupported format error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        VdiskError::UnsupportedFormat(message.into())
    }

    /// True for the not-found family a controller reports as "record not found"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VdiskError::TrackNotFound { .. } | VdiskError::SectorNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VdiskError::SectorNotFound {
            cylinder: 3,
            head: 1,
            sector: 19,
        };
        assert_eq!(
            err.to_string(),
            "Sector not found: cylinder 3, head 1, sector 19"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_error() {
        let err = VdiskError::parse(12, "Truncated header");
        assert_eq!(err.to_string(), "Parse error at offset 12: Truncated header");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_geometry_error() {
        let err = VdiskError::InvalidGeometry {
            cylinders: 300,
            heads: 1,
            track_length: 0x1900,
        };
        assert_eq!(
            err.to_string(),
            "Invalid geometry: 300 cylinders, 1 heads, track length 6400"
        );
    }
}
