use std::collections::TryReserveError;

use crate::constants::*;

/// Physical memory as a row of frames.
///
/// Each frame records the page it currently holds, which doubles as the
/// reverse `frame -> page` index used to invalidate stale page table entries
/// without scanning the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalMemory {
    frames: Vec<Option<usize>>,
}

impl PhysicalMemory {
    /// Create physical memory with `frame_count` empty frames
    pub fn new(frame_count: usize) -> Self {
        PhysicalMemory { frames: vec![None; frame_count] }
    }

    /// Like [`PhysicalMemory::new`], but reports a failed allocation.
    pub fn try_new(frame_count: usize) -> Result<Self, TryReserveError> {
        let mut frames = Vec::new();
        frames.try_reserve_exact(frame_count)?;
        frames.resize(frame_count, None);
        Ok(PhysicalMemory { frames })
    }

    /// Number of frames
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether `frame` currently holds a page
    #[inline]
    pub fn is_occupied(&self, frame: usize) -> bool {
        matches!(self.frames.get(frame), Some(Some(_)))
    }

    /// Page loaded in `frame`, if any
    #[inline]
    pub fn occupant(&self, frame: usize) -> Option<usize> {
        self.frames.get(frame).copied().flatten()
    }

    /// Lowest-indexed empty frame
    pub fn first_empty(&self) -> Option<usize> {
        self.frames.iter().position(Option::is_none)
    }

    /// Load `page` into `frame`, returning the page it displaced.
    pub fn load(&mut self, frame: usize, page: usize) -> Option<usize> {
        self.frames[frame].replace(page)
    }

    /// Number of occupied frames
    pub fn occupied_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_some()).count()
    }

    /// Occupancy column as printed in reports: `1` occupied, `-1` empty.
    #[inline]
    pub fn occupancy_code(&self, frame: usize) -> i64 {
        if self.is_occupied(frame) { OCCUPIED_FRAME } else { EMPTY_FRAME }
    }

    /// Iterate over `(frame, occupant)` in frame order
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
        self.frames.iter().copied().enumerate()
    }
}
