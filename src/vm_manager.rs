//! Simulation driver.
//!
//! Consumes the record stream one line at a time: two header records (page
//! size, memory size), then any number of sessions, each opened by `NEW`
//! followed by the session's virtual memory size and its reference records.

use log::{info, warn};

use crate::constants::*;
use crate::error::{ConfigError, Result, SimError};
use crate::io::Reporter;
use crate::page_table::{CounterScope, Counters, Lookup, PageTable};
use crate::replacement::ReplacementPolicy;
use crate::translation::{
    AddressLayout, PhysicalAddress, SessionConfig, VirtualAddress, check_capacity, log2_exact,
};

/// What one record did to the simulation.
#[derive(Debug)]
pub enum Event {
    PageSize(usize),
    MemorySize(usize),
    /// `NEW` seen; the next record is the session's `vm_size`
    SessionMarker,
    SessionStarted(SessionConfig),
    Reference {
        address: VirtualAddress,
        lookup: Lookup,
        physical: PhysicalAddress,
    },
    /// The record was reported and skipped
    Rejected(SimError),
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub records: usize,
    pub sessions: usize,
    pub references: usize,
    pub rejected: usize,
    pub counters: Counters,
}

impl RunSummary {
    #[inline]
    pub fn fault_ratio(&self) -> Option<f64> {
        self.counters.fault_ratio()
    }
}

#[derive(Debug)]
pub struct VmManager {
    records: usize,
    page_size: Option<usize>,
    mm_size: Option<usize>,
    awaiting_vm_size: bool,
    session: Option<SessionConfig>,
    page_table: PageTable,
    sessions: usize,
    references: usize,
    rejected: usize,
}

impl VmManager {
    pub fn new(policy: Box<dyn ReplacementPolicy>, scope: CounterScope) -> Self {
        VmManager {
            records: 0,
            page_size: None,
            mm_size: None,
            awaiting_vm_size: false,
            session: None,
            page_table: PageTable::with_policy(policy, scope),
            sessions: 0,
            references: 0,
            rejected: 0,
        }
    }

    /// Process one record.
    ///
    /// Returns `Ok(None)` for blank lines. An `Err` means the header is
    /// unusable and the run cannot continue; every other problem comes back
    /// as [`Event::Rejected`].
    pub fn feed(&mut self, line: &str) -> Result<Option<Event>> {
        let record = line.trim();
        if record.is_empty() {
            return Ok(None);
        }
        self.records += 1;

        let event = match self.records {
            PAGE_SIZE_RECORD => {
                let page_size = parse_size("page_size", record)?;
                self.page_size = Some(page_size);
                Event::PageSize(page_size)
            }
            MM_SIZE_RECORD => {
                let mm_size = check_capacity("mm_size", parse_size("mm_size", record)?)?;
                self.mm_size = Some(mm_size);
                Event::MemorySize(mm_size)
            }
            _ if record == NEW_SESSION_TOKEN => {
                self.awaiting_vm_size = true;
                Event::SessionMarker
            }
            _ if self.awaiting_vm_size => {
                self.awaiting_vm_size = false;
                match self.start_session(record) {
                    Ok(config) => Event::SessionStarted(config),
                    Err(err) => self.reject(record, err),
                }
            }
            _ => match self.reference(record) {
                Ok(event) => event,
                Err(err) => self.reject(record, err),
            },
        };
        Ok(Some(event))
    }

    /// Drive a whole record stream, reporting after every record.
    pub fn run<I, S, W>(&mut self, lines: I, reporter: &mut Reporter<W>) -> Result<RunSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: std::io::Write,
    {
        for line in lines {
            let line = line.as_ref();
            if let Some(event) = self.feed(line)? {
                reporter.record(self.records, line.trim(), &event, self)?;
            }
        }
        let summary = self.finish()?;
        reporter.summary(&summary)?;
        Ok(summary)
    }

    /// Totals so far; fails if the stream never completed its header.
    pub fn finish(&self) -> Result<RunSummary> {
        self.header()?;
        Ok(self.summary())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            records: self.records,
            sessions: self.sessions,
            references: self.references,
            rejected: self.rejected,
            counters: self.page_table.counters(),
        }
    }

    /// Current page table and physical memory, for reporting.
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn session(&self) -> Option<&SessionConfig> {
        self.session.as_ref()
    }

    pub fn layout(&self) -> Option<AddressLayout> {
        self.session.map(|s| s.layout())
    }

    fn start_session(&mut self, record: &str) -> Result<SessionConfig> {
        // Whatever happens, the previous session is gone
        self.session = None;
        self.page_table.initialize(0, 0)?;

        let (page_size, mm_size) = self.header()?;
        let vm_size = parse_size("vm_size", record)?;
        let config = SessionConfig::new(page_size, mm_size, vm_size)?;

        self.page_table.initialize(config.page_table_size(), config.frame_count())?;
        self.session = Some(config);
        self.sessions += 1;

        let layout = config.layout();
        info!(
            "session {}: {} pages, {} frames, {} page digits + {} offset digits",
            self.sessions,
            config.page_table_size(),
            config.frame_count(),
            layout.page_digits,
            layout.offset_digits
        );
        Ok(config)
    }

    /// `(page_size, mm_size)`, naming the first header record that is missing.
    fn header(&self) -> std::result::Result<(usize, usize), ConfigError> {
        let page_size = self.page_size.ok_or(ConfigError::MissingHeader { field: "page_size" })?;
        let mm_size = self.mm_size.ok_or(ConfigError::MissingHeader { field: "mm_size" })?;
        Ok((page_size, mm_size))
    }

    fn reference(&mut self, record: &str) -> Result<Event> {
        let layout = self
            .layout()
            .ok_or_else(|| SimError::NoActiveSession { record: record.to_string() })?;
        let address = VirtualAddress::parse(record, layout)?;
        let lookup = self.page_table.lookup_or_fault(address.page)?;
        self.references += 1;

        let physical = PhysicalAddress { frame: lookup.frame, offset: address.offset };
        Ok(Event::Reference { address, lookup, physical })
    }

    fn reject(&mut self, record: &str, err: SimError) -> Event {
        self.rejected += 1;
        warn!("record {} ({:?}) skipped: {}", self.records, record, err);
        Event::Rejected(err)
    }
}

impl Default for VmManager {
    fn default() -> Self {
        VmManager::new(Box::new(crate::replacement::FixedVictim), CounterScope::Run)
    }
}

/// Parse a power-of-two size record.
fn parse_size(field: &'static str, record: &str) -> std::result::Result<usize, ConfigError> {
    let value: usize = record.parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: record.to_string(),
    })?;
    log2_exact(field, value)?;
    Ok(value)
}
