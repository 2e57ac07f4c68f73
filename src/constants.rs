/// Record that opens a new session; the next record carries `vm_size`.
pub const NEW_SESSION_TOKEN: &str = "NEW";

/// Input file read when no path is given on the command line.
pub const DEFAULT_INPUT_FILE: &str = "input.txt";

/// Frame column value printed for an unmapped page table entry.
pub const UNMAPPED_FRAME: i64 = -1;

/// Occupancy column values printed for physical memory.
pub const EMPTY_FRAME: i64 = -1;
pub const OCCUPIED_FRAME: i64 = 1;

/// Frame evicted by the default replacement policy.
pub const FIXED_VICTIM_FRAME: usize = 0;

/// Header records that precede the first session.
pub const PAGE_SIZE_RECORD: usize = 1;
pub const MM_SIZE_RECORD: usize = 2;

/// Largest page table or physical memory a session may ask for.
pub const MAX_SESSION_ENTRIES: usize = 1 << 24;
