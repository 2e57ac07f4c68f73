pub mod constants;
pub mod error;
pub mod io;
pub mod logger;
pub mod memory;
pub mod page_table;
pub mod replacement;
pub mod translation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use error::{Result, SimError};
pub use page_table::{CounterScope, Lookup, Outcome, PageTable, PageTableEntry};
pub use replacement::{FixedVictim, Fifo, PolicyKind, ReplacementPolicy};
pub use translation::{VirtualAddress, decode_bit_field, field_split};
pub use vm_manager::{Event, RunSummary, VmManager};
