/// Disk engine configuration
///
/// Passed by value into the geometry store and codec entry points; each
/// [`VirtualDisk`](crate::VirtualDisk) keeps its own copy.

use crate::format::interleave::Interleave;
use crate::format::constants::DEFAULT_CYLINDERS;

/// Configuration for disk creation, growth and loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskConfig {
    /// Default write-back policy for newly created or loaded disks
    pub write_back: bool,
    /// Extra "standard" cylinder count used when rounding up on growth
    pub default_cylinders: usize,
    /// Preferred 18-sector double-density interleave
    pub interleave: Interleave,
    /// Probe headerless sector dumps for an OS-9 superblock
    pub auto_os9: bool,
}

impl DiskConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self {
            write_back: false,
            default_cylinders: DEFAULT_CYLINDERS,
            interleave: Interleave::DragonDos,
            auto_os9: true,
        }
    }

    /// Set the write-back policy
    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    /// Set the default cylinder count
    pub fn with_default_cylinders(mut self, cylinders: usize) -> Self {
        self.default_cylinders = cylinders;
        self
    }

    /// Set the double-density interleave preference
    pub fn with_interleave(mut self, interleave: Interleave) -> Self {
        self.interleave = interleave;
        self
    }

    /// Enable or disable OS-9 auto-detection
    pub fn with_auto_os9(mut self, auto_os9: bool) -> Self {
        self.auto_os9 = auto_os9;
        self
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self::new()
    }
}
