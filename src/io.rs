use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::page_table::{Outcome, PageTable};
use crate::vm_manager::{Event, RunSummary, VmManager};

/// Read every line of the record stream.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Format a fault ratio, `n/a` before the first reference.
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.4}", r),
        None => "n/a".to_string(),
    }
}

/// Writes per-record results and page table dumps to a sink.
pub struct Reporter<W: Write> {
    out: W,
    dump_tables: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Reporter { out, dump_tables: true }
    }

    /// Skip the page table / memory dump after each record.
    pub fn without_tables(mut self) -> Self {
        self.dump_tables = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Report one record and the state it left behind.
    pub fn record(&mut self, index: usize, text: &str, event: &Event, vm: &VmManager) -> std::io::Result<()> {
        writeln!(self.out, "--- record {}: {} ---", index, text)?;

        match event {
            Event::PageSize(size) => writeln!(self.out, "page size: {}", size)?,
            Event::MemorySize(size) => writeln!(self.out, "main memory frames: {}", size)?,
            Event::SessionMarker => writeln!(self.out, "new session")?,
            Event::SessionStarted(config) => {
                let layout = config.layout();
                writeln!(
                    self.out,
                    "session: {} pages, {} frames, page field {} digits, offset field {} digits",
                    config.page_table_size(),
                    config.frame_count(),
                    layout.page_digits,
                    layout.offset_digits
                )?;
            }
            Event::Reference { address, lookup, physical } => {
                match lookup.outcome {
                    Outcome::Hit => {
                        writeln!(self.out, "hit on page {} -> frame {}", lookup.page, lookup.frame)?;
                    }
                    Outcome::Fault { prior_ratio, evicted } => {
                        writeln!(
                            self.out,
                            "page fault on page {}, fault ratio before this fault: {}",
                            address.page,
                            format_ratio(prior_ratio)
                        )?;
                        if let Some(victim) = evicted {
                            writeln!(
                                self.out,
                                "evicted page {} from frame {}",
                                victim, lookup.frame
                            )?;
                        }
                    }
                }
                if let Some(layout) = vm.layout() {
                    writeln!(
                        self.out,
                        "frame {}, offset {} (physical address {})",
                        physical.frame,
                        physical.offset,
                        physical.raw(layout)
                    )?;
                }
            }
            Event::Rejected(err) => writeln!(self.out, "rejected: {}", err)?,
        }

        if self.dump_tables {
            self.tables(vm.page_table())?;
        }
        Ok(())
    }

    /// Dump the page table and physical memory in index order.
    pub fn tables(&mut self, pt: &PageTable) -> std::io::Result<()> {
        writeln!(self.out, "Page table:")?;
        writeln!(self.out, "| page | frame | valid |")?;
        for (page, entry) in pt.entries().iter().enumerate() {
            writeln!(
                self.out,
                "| {} | {} | {} |",
                page,
                entry.frame_code(),
                u8::from(entry.valid)
            )?;
        }

        writeln!(self.out, "Main memory:")?;
        writeln!(self.out, "| frame | occupied |")?;
        let memory = pt.memory();
        for (frame, _) in memory.iter() {
            writeln!(self.out, "| {} | {} |", frame, memory.occupancy_code(frame))?;
        }
        Ok(())
    }

    pub fn summary(&mut self, summary: &RunSummary) -> std::io::Result<()> {
        writeln!(
            self.out,
            "=== {} records, {} sessions, {} references ({} rejected): {} hits, {} misses, fault ratio {} ===",
            summary.records,
            summary.sessions,
            summary.references,
            summary.rejected,
            summary.counters.hits,
            summary.counters.misses,
            format_ratio(summary.fault_ratio())
        )?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(lines: &[&str], tables: bool) -> String {
        let mut vm = VmManager::default();
        let reporter = Reporter::new(Vec::new());
        let mut reporter = if tables { reporter } else { reporter.without_tables() };
        vm.run(lines.iter().copied(), &mut reporter).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(None), "n/a");
        assert_eq!(format_ratio(Some(1.0)), "1.0000");
        assert_eq!(format_ratio(Some(0.5)), "0.5000");
    }

    #[test]
    fn test_report_faults_and_hits() {
        let out = render(&["2", "2", "NEW", "4", "001", "001", "101"], false);

        assert!(out.contains("--- record 1: 2 ---"));
        assert!(out.contains("page fault on page 0, fault ratio before this fault: n/a"));
        assert!(out.contains("hit on page 0 -> frame 0"));
        assert!(out.contains("page fault on page 2, fault ratio before this fault: 0.5000"));
        assert!(out.contains("frame 1, offset 1 (physical address 3)"));
        assert!(!out.contains("Page table:"));
        assert!(out.contains("1 hits, 2 misses"));
    }

    #[test]
    fn test_report_eviction() {
        let out = render(&["2", "2", "NEW", "4", "000", "010", "100"], false);
        assert!(out.contains("evicted page 0 from frame 0"));
    }

    #[test]
    fn test_report_tables_after_every_record() {
        let out = render(&["2", "2", "NEW", "4", "011"], true);

        assert_eq!(out.matches("Page table:").count(), 5);
        assert!(out.contains("| 1 | 0 | 1 |"));
        assert!(out.contains("| 0 | -1 | 0 |"));
        assert!(out.contains("| 0 | 1 |"));
        assert!(out.contains("| 1 | -1 |"));
    }

    #[test]
    fn test_report_rejected() {
        let out = render(&["2", "2", "NEW", "4", "0x1"], false);
        assert!(out.contains("rejected: invalid digit 'x'"));
        assert!(out.contains("(1 rejected)"));
    }

    #[test]
    fn test_read_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        fs::write(&path, "2\n2\nNEW\n4\n001\n").unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records, vec!["2", "2", "NEW", "4", "001"]);
    }

    #[test]
    fn test_read_records_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_records(dir.path().join("nope.txt")).is_err());
    }
}
