//! Frame allocation and replacement.
//!
//! On a fault the allocator hands out the lowest empty frame. When memory is
//! full it asks a [`ReplacementPolicy`] for a victim. Either way the entry
//! that last pointed at the chosen frame is invalidated before the frame is
//! returned, so valid entries and occupied frames stay one-to-one.

use std::collections::VecDeque;

use clap::ValueEnum;
use log::{debug, warn};

use crate::constants::FIXED_VICTIM_FRAME;
use crate::memory::PhysicalMemory;
use crate::page_table::PageTableEntry;

/// Picks the frame to evict when physical memory is full.
pub trait ReplacementPolicy: std::fmt::Debug {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Choose a victim among the (all occupied) frames of `memory`.
    fn select_victim(&mut self, memory: &PhysicalMemory, entries: &[PageTableEntry]) -> usize;

    /// Called after a page has been loaded into `frame`.
    fn record_load(&mut self, _frame: usize) {}

    /// Forget all history; called when a new session starts.
    fn reset(&mut self) {}
}

/// Always evicts frame 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedVictim;

impl ReplacementPolicy for FixedVictim {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn select_victim(&mut self, _memory: &PhysicalMemory, _entries: &[PageTableEntry]) -> usize {
        FIXED_VICTIM_FRAME
    }
}

/// Evicts the frame whose current page was loaded longest ago.
#[derive(Debug, Clone, Default)]
pub struct Fifo {
    arrivals: VecDeque<usize>,
}

impl Fifo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplacementPolicy for Fifo {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn select_victim(&mut self, memory: &PhysicalMemory, _entries: &[PageTableEntry]) -> usize {
        // Only frames that are still occupied are eligible; anything else in
        // the queue is left over from before a reset.
        while let Some(frame) = self.arrivals.pop_front() {
            if memory.is_occupied(frame) {
                return frame;
            }
        }
        FIXED_VICTIM_FRAME
    }

    fn record_load(&mut self, frame: usize) {
        self.arrivals.retain(|&f| f != frame);
        self.arrivals.push_back(frame);
    }

    fn reset(&mut self) {
        self.arrivals.clear();
    }
}

/// Replacement policies selectable from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Always evict frame 0
    #[default]
    Fixed,
    /// Evict the oldest loaded frame
    Fifo,
}

impl PolicyKind {
    pub fn build(self) -> Box<dyn ReplacementPolicy> {
        match self {
            PolicyKind::Fixed => Box::new(FixedVictim),
            PolicyKind::Fifo => Box::new(Fifo::new()),
        }
    }
}

/// Result of satisfying one fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub frame: usize,
    /// Page whose mapping was invalidated to free `frame`
    pub evicted: Option<usize>,
}

/// Find a frame for `page` and load it there.
///
/// Returns `None` only when physical memory has no frames at all. The
/// caller is responsible for marking `entries[page]` valid.
pub fn allocate(
    memory: &mut PhysicalMemory,
    entries: &mut [PageTableEntry],
    policy: &mut dyn ReplacementPolicy,
    page: usize,
) -> Option<Allocation> {
    if memory.is_empty() {
        return None;
    }

    let frame = match memory.first_empty() {
        Some(frame) => frame,
        None => {
            let victim = policy.select_victim(memory, entries);
            if victim < memory.len() {
                debug!("memory full, {} policy evicts frame {}", policy.name(), victim);
                victim
            } else {
                warn!(
                    "{} policy chose frame {} of {}, evicting frame {} instead",
                    policy.name(),
                    victim,
                    memory.len(),
                    FIXED_VICTIM_FRAME
                );
                FIXED_VICTIM_FRAME
            }
        }
    };

    let evicted = memory.load(frame, page);
    if let Some(entry) = evicted.and_then(|stale| entries.get_mut(stale)) {
        *entry = PageTableEntry::unmapped();
    }
    policy.record_load(frame);

    Some(Allocation { frame, evicted })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(size: usize) -> Vec<PageTableEntry> {
        vec![PageTableEntry::unmapped(); size]
    }

    fn map(memory: &mut PhysicalMemory, entries: &mut [PageTableEntry], page: usize, frame: usize) {
        memory.load(frame, page);
        entries[page] = PageTableEntry::mapped(frame);
    }

    #[test]
    fn test_allocate_lowest_empty_frame() {
        let mut memory = PhysicalMemory::new(3);
        let mut entries = table(4);
        map(&mut memory, &mut entries, 2, 0);

        let alloc = allocate(&mut memory, &mut entries, &mut FixedVictim, 3).unwrap();
        assert_eq!(alloc, Allocation { frame: 1, evicted: None });
        assert_eq!(memory.occupant(1), Some(3));
        // Existing mapping untouched
        assert_eq!(entries[2], PageTableEntry::mapped(0));
    }

    #[test]
    fn test_allocate_evicts_frame_zero_when_full() {
        let mut memory = PhysicalMemory::new(2);
        let mut entries = table(4);
        map(&mut memory, &mut entries, 1, 0);
        map(&mut memory, &mut entries, 3, 1);

        let alloc = allocate(&mut memory, &mut entries, &mut FixedVictim, 2).unwrap();
        assert_eq!(alloc, Allocation { frame: 0, evicted: Some(1) });
        assert_eq!(entries[1], PageTableEntry::unmapped());
        assert_eq!(entries[3], PageTableEntry::mapped(1));
        assert_eq!(memory.occupant(0), Some(2));
    }

    #[test]
    fn test_allocate_without_frames() {
        let mut memory = PhysicalMemory::new(0);
        let mut entries = table(2);
        assert_eq!(allocate(&mut memory, &mut entries, &mut FixedVictim, 0), None);
    }

    /// Always names a frame past the end of memory.
    #[derive(Debug)]
    struct PastTheEnd;

    impl ReplacementPolicy for PastTheEnd {
        fn name(&self) -> &'static str {
            "past-the-end"
        }

        fn select_victim(&mut self, memory: &PhysicalMemory, _: &[PageTableEntry]) -> usize {
            memory.len() + 3
        }
    }

    #[test]
    fn test_out_of_range_victim_falls_back_to_frame_zero() {
        let mut memory = PhysicalMemory::new(2);
        let mut entries = table(4);
        map(&mut memory, &mut entries, 1, 0);
        map(&mut memory, &mut entries, 3, 1);

        let alloc = allocate(&mut memory, &mut entries, &mut PastTheEnd, 2).unwrap();
        assert_eq!(alloc, Allocation { frame: FIXED_VICTIM_FRAME, evicted: Some(1) });
        assert_eq!(entries[1], PageTableEntry::unmapped());
        assert_eq!(memory.occupant(0), Some(2));
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_fixed_victim_ignores_history() {
        let mut policy = FixedVictim;
        let memory = PhysicalMemory::new(4);
        policy.record_load(3);
        assert_eq!(policy.select_victim(&memory, &[]), 0);
        assert_eq!(policy.name(), "fixed");
    }

    #[test]
    fn test_fifo_evicts_in_arrival_order() {
        let mut memory = PhysicalMemory::new(2);
        let mut entries = table(8);
        let mut policy = Fifo::new();

        let frames: Vec<usize> = [0, 1, 2, 3, 4]
            .iter()
            .map(|&page| {
                let alloc = allocate(&mut memory, &mut entries, &mut policy, page).unwrap();
                entries[page] = PageTableEntry::mapped(alloc.frame);
                alloc.frame
            })
            .collect();

        assert_eq!(frames, vec![0, 1, 0, 1, 0]);
        assert_eq!(memory.occupant(0), Some(4));
        assert_eq!(memory.occupant(1), Some(3));
    }

    #[test]
    fn test_fifo_reset_forgets_history() {
        let mut policy = Fifo::new();
        policy.record_load(1);
        policy.record_load(0);
        policy.reset();

        let mut memory = PhysicalMemory::new(2);
        memory.load(0, 0);
        memory.load(1, 1);
        assert_eq!(policy.select_victim(&memory, &[]), 0);
    }

    #[test]
    fn test_policy_kind_build() {
        assert_eq!(PolicyKind::default(), PolicyKind::Fixed);
        assert_eq!(PolicyKind::Fixed.build().name(), "fixed");
        assert_eq!(PolicyKind::Fifo.build().name(), "fifo");
    }
}
