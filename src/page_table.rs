//! Single-level page table with demand paging.
//!
//! The table owns its entries, the physical memory they map into and the
//! replacement policy used once memory is full. Hit and miss counters live
//! here as well; whether they survive a re-initialisation is decided by
//! [`CounterScope`].

use log::{debug, trace};

use crate::constants::UNMAPPED_FRAME;
use crate::error::{AddressOutOfRangeError, ConfigError, LookupError};
use crate::memory::PhysicalMemory;
use crate::replacement::{FixedVictim, ReplacementPolicy, allocate};

/// One page table row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub frame: Option<usize>,
    pub valid: bool,
}

impl PageTableEntry {
    #[inline]
    pub const fn unmapped() -> Self {
        PageTableEntry { frame: None, valid: false }
    }

    #[inline]
    pub const fn mapped(frame: usize) -> Self {
        PageTableEntry { frame: Some(frame), valid: true }
    }

    /// Frame column as printed in reports (`-1` when unmapped)
    pub fn frame_code(&self) -> i64 {
        self.frame.map_or(UNMAPPED_FRAME, |f| f as i64)
    }
}

/// How long hit/miss counters accumulate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CounterScope {
    /// Counters span every session of the run
    #[default]
    Run,
    /// Counters restart at every session
    Session,
}

/// Hit and miss totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub hits: u64,
    pub misses: u64,
}

impl Counters {
    #[inline]
    pub fn references(&self) -> u64 {
        self.hits + self.misses
    }

    /// `misses / (hits + misses)`, or `None` before any reference.
    pub fn fault_ratio(&self) -> Option<f64> {
        match self.references() {
            0 => None,
            total => Some(self.misses as f64 / total as f64),
        }
    }
}

/// What a lookup did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Hit,
    Fault {
        /// Fault ratio before this fault was counted
        prior_ratio: Option<f64>,
        /// Page that lost its frame to this fault
        evicted: Option<usize>,
    },
}

/// Result of [`PageTable::lookup_or_fault`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup {
    pub page: usize,
    pub frame: usize,
    pub outcome: Outcome,
}

impl Lookup {
    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self.outcome, Outcome::Fault { .. })
    }
}

#[derive(Debug)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
    memory: PhysicalMemory,
    policy: Box<dyn ReplacementPolicy>,
    counters: Counters,
    scope: CounterScope,
}

impl PageTable {
    /// Empty table using the fixed-victim policy and run-wide counters.
    pub fn new() -> Self {
        Self::with_policy(Box::new(FixedVictim), CounterScope::Run)
    }

    pub fn with_policy(policy: Box<dyn ReplacementPolicy>, scope: CounterScope) -> Self {
        PageTable {
            entries: Vec::new(),
            memory: PhysicalMemory::new(0),
            policy,
            counters: Counters::default(),
            scope,
        }
    }

    /// Start a new session: `size` unmapped pages and `frame_count` empty frames.
    ///
    /// Previous mappings are discarded, not migrated. If either the table or
    /// the memory cannot be allocated the table is left as it was.
    pub fn initialize(&mut self, size: usize, frame_count: usize) -> Result<(), ConfigError> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(size)
            .map_err(|_| ConfigError::TooLarge { field: "vm_size", value: size })?;
        entries.resize(size, PageTableEntry::unmapped());
        let memory = PhysicalMemory::try_new(frame_count)
            .map_err(|_| ConfigError::TooLarge { field: "mm_size", value: frame_count })?;

        self.entries = entries;
        self.memory = memory;
        self.policy.reset();
        if self.scope == CounterScope::Session {
            self.counters = Counters::default();
        }
        debug!(
            "page table initialised: {} pages, {} frames, {} policy",
            size,
            frame_count,
            self.policy.name()
        );
        Ok(())
    }

    /// Translate `page`, faulting it in if it is not resident.
    ///
    /// An out-of-range page or a memory without frames leaves the table and
    /// counters untouched.
    pub fn lookup_or_fault(&mut self, page: usize) -> Result<Lookup, LookupError> {
        let size = self.entries.len();
        let entry = *self
            .entries
            .get(page)
            .ok_or(AddressOutOfRangeError { page, size })?;

        if let (true, Some(frame)) = (entry.valid, entry.frame) {
            self.counters.hits += 1;
            trace!("hit: page {} -> frame {}", page, frame);
            return Ok(Lookup { page, frame, outcome: Outcome::Hit });
        }

        let prior_ratio = self.counters.fault_ratio();
        let alloc = allocate(&mut self.memory, &mut self.entries, self.policy.as_mut(), page)
            .ok_or(LookupError::NoFrames { page })?;
        self.counters.misses += 1;
        self.entries[page] = PageTableEntry::mapped(alloc.frame);

        match alloc.evicted {
            Some(victim) => debug!(
                "fault: page {} -> frame {} (evicted page {})",
                page, alloc.frame, victim
            ),
            None => debug!("fault: page {} -> free frame {}", page, alloc.frame),
        }

        Ok(Lookup {
            page,
            frame: alloc.frame,
            outcome: Outcome::Fault { prior_ratio, evicted: alloc.evicted },
        })
    }

    /// `misses / (hits + misses)`; `None` until a reference has been seen.
    #[inline]
    pub fn fault_ratio(&self) -> Option<f64> {
        self.counters.fault_ratio()
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.counters.hits
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.counters.misses
    }

    #[inline]
    pub fn counters(&self) -> Counters {
        self.counters
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, page: usize) -> Option<&PageTableEntry> {
        self.entries.get(page)
    }

    pub fn entries(&self) -> &[PageTableEntry] {
        &self.entries
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Check that valid entries and occupied frames correspond one-to-one.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut owners: Vec<Option<usize>> = vec![None; self.memory.len()];

        for (page, entry) in self.entries.iter().enumerate() {
            match (entry.valid, entry.frame) {
                (true, Some(frame)) => {
                    let slot = owners
                        .get_mut(frame)
                        .ok_or_else(|| format!("page {} maps to missing frame {}", page, frame))?;
                    if let Some(other) = slot.replace(page) {
                        return Err(format!("pages {} and {} share frame {}", other, page, frame));
                    }
                    if self.memory.occupant(frame) != Some(page) {
                        return Err(format!("frame {} does not record page {}", frame, page));
                    }
                }
                (false, None) => {}
                (valid, frame) => {
                    return Err(format!("page {} has valid={} but frame={:?}", page, valid, frame));
                }
            }
        }

        for (frame, occupant) in self.memory.iter() {
            if occupant.is_some() && owners[frame].is_none() {
                return Err(format!("frame {} is occupied but no valid entry maps it", frame));
            }
        }
        Ok(())
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}
