/*!
# vdisk

A Rust library emulating floppy disks for Dragon and Tandy Color Computer
emulators, at the level a WD279x-style controller sees them.

## Features

- Raw FM and MFM tracks with gaps, sync fields, address marks and CRCs
- Sector read and write by (cylinder, head, sector id)
- Automatic growth of the geometry to standard cylinder counts
- Load and save VDK, JVC (including headerless OS-9) and DMK images
- Idiomatic Rust API with comprehensive error handling

## Quick Start

```rust,no_run
use vdisk::{DiskConfig, DiskFormat, VirtualDisk};

// Open an existing image
let config = DiskConfig::default().with_write_back(true);
let mut disk = VirtualDisk::open("dragon.vdk", &config)?;

// Read a sector
let mut buf = [0u8; 256];
disk.fetch_sector(20, 0, 3, &mut buf)?;

// Write a sector
disk.update_sector(20, 0, 3, &[0x55; 256])?;

// Save changes back to dragon.vdk
disk.save(false)?;

// Create a new, formatted 40-track disk and save it as JVC
let mut new_disk = VirtualDisk::builder().format(DiskFormat::Jvc).build()?;
new_disk.save_as("blank.dsk")?;
# Ok::<(), vdisk::VdiskError>(())
```

## Track layout

Every track begins with a 128-byte table of IDAM slots, one little-endian
16-bit entry per sector. The low 14 bits hold the offset of the sector's
ID address mark within the track and bit 15 is set for MFM. The cell
data follows. In FM every logical byte is stored twice.

## Modules

- `config`: Engine configuration
- `crc`: CRC-16/CCITT as used by the controller
- `format`: Interchange formats, constants and interleave tables
- `image`: Virtual disk, track synthesis and sector access
- `io`: VDK, JVC and DMK codecs
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// Engine configuration
pub mod config;
/// CRC-16/CCITT
pub mod crc;
/// Error types and Result alias
pub mod error;
/// Interchange formats, constants and interleave tables
pub mod format;
/// Virtual disk, track synthesis and sector access
pub mod image;
/// I/O operations for loading and saving disk images
pub mod io;
/// Track map visualization
pub mod map;

// Re-export common types
pub use config::DiskConfig;
pub use error::{Result, VdiskError};
pub use format::{DiskFormat, Interleave};
pub use image::{
    FormatExtras, Idam, RecordingMode, SectorId, Side, TrackLayout, VirtualDisk,
    VirtualDiskBuilder,
};
pub use io::{FileRequester, JvcParams, VdkExtras};
