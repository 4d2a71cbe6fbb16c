/// Per-head raw track storage

use crate::error::{Result, VdiskError};

/// Allocate a zero-filled buffer, reporting allocation failure as an error
pub(crate) fn zeroed(len: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| VdiskError::Allocation(len))?;
    data.resize(len, 0);
    Ok(data)
}

/// One head's worth of tracks, stored cylinder after cylinder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side {
    /// Head number (0 or 1)
    pub head: u8,
    data: Vec<u8>,
}

impl Side {
    /// Create a zero-filled side of `len` bytes
    pub fn new(head: u8, len: usize) -> Result<Self> {
        Ok(Self {
            head,
            data: zeroed(len)?,
        })
    }

    /// Get the raw bytes of every track on this side
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the raw bytes
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this side holds no tracks
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the track at `cyl`
    pub fn track(&self, cyl: usize, track_length: usize) -> Option<&[u8]> {
        let start = cyl.checked_mul(track_length)?;
        self.data.get(start..start + track_length)
    }

    /// Get a mutable reference to the track at `cyl`
    pub fn track_mut(&mut self, cyl: usize, track_length: usize) -> Option<&mut [u8]> {
        let start = cyl.checked_mul(track_length)?;
        self.data.get_mut(start..start + track_length)
    }

    /// Grow to `len` bytes, zero-filling the new space. Never shrinks.
    pub fn grow(&mut self, len: usize) -> Result<()> {
        if len <= self.data.len() {
            return Ok(());
        }
        let additional = len - self.data.len();
        self.data
            .try_reserve_exact(additional)
            .map_err(|_| VdiskError::Allocation(len))?;
        self.data.resize(len, 0);
        Ok(())
    }

    /// Release the storage
    pub fn clear(&mut self) {
        self.data = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_side() {
        let side = Side::new(1, 400).unwrap();
        assert_eq!(side.head, 1);
        assert_eq!(side.len(), 400);
        assert!(side.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_track_lookup() {
        let mut side = Side::new(0, 3 * 200).unwrap();
        side.track_mut(1, 200).unwrap()[0] = 0x42;

        assert_eq!(side.data()[200], 0x42);
        assert_eq!(side.track(1, 200).unwrap().len(), 200);
        assert!(side.track(2, 200).is_some());
        assert!(side.track(3, 200).is_none());
    }

    #[test]
    fn test_grow_preserves_data() {
        let mut side = Side::new(0, 200).unwrap();
        side.data_mut()[199] = 0x99;

        side.grow(600).unwrap();
        assert_eq!(side.len(), 600);
        assert_eq!(side.data()[199], 0x99);
        assert!(side.data()[200..].iter().all(|&b| b == 0));

        // Ensure it doesn't shrink
        side.grow(100).unwrap();
        assert_eq!(side.len(), 600);
    }

    #[test]
    fn test_clear() {
        let mut side = Side::new(0, 200).unwrap();
        side.clear();
        assert!(side.is_empty());
        assert!(side.track(0, 200).is_none());
    }
}
