/// Sector interleave tables
///
/// Each table maps a physical slot on the track to a logical sector offset
/// from the first sector id.

/// DragonDOS 18-sector double-density order (2:1)
pub const DRAGONDOS_INTERLEAVE: [u8; 18] =
    [0, 9, 1, 10, 2, 11, 3, 12, 4, 13, 5, 14, 6, 15, 7, 16, 8, 17];

/// RS-DOS 18-sector double-density order (step 11)
pub const RSDOS_INTERLEAVE: [u8; 18] =
    [0, 11, 4, 15, 8, 1, 12, 5, 16, 9, 2, 13, 6, 17, 10, 3, 14, 7];

/// 10-sector single-density order (2:1)
pub const SINGLE_DENSITY_INTERLEAVE: [u8; 10] = [0, 5, 1, 6, 2, 7, 3, 8, 4, 9];

/// Preferred interleave for 18-sector double-density tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interleave {
    /// Dragon DOS ordering
    DragonDos,
    /// Tandy Color Computer Disk BASIC ordering
    RsDos,
}

impl Interleave {
    /// Look up the physical order for a (density, sector count) pair
    ///
    /// Returns `None` when no table applies and sectors go in logical order.
    pub fn table(self, double_density: bool, nsectors: usize) -> Option<&'static [u8]> {
        match (double_density, nsectors) {
            (true, 18) => Some(match self {
                Interleave::DragonDos => &DRAGONDOS_INTERLEAVE[..],
                Interleave::RsDos => &RSDOS_INTERLEAVE[..],
            }),
            (false, 10) => Some(&SINGLE_DENSITY_INTERLEAVE[..]),
            _ => None,
        }
    }

    /// Logical sector offset written at physical slot `slot`
    pub fn sector_at(self, double_density: bool, nsectors: usize, slot: usize) -> usize {
        self.table(double_density, nsectors)
            .and_then(|t| t.get(slot))
            .map(|&s| s as usize)
            .unwrap_or(slot)
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Interleave::DragonDos => "DragonDOS",
            Interleave::RsDos => "RS-DOS",
        }
    }
}
