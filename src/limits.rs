// ── Operational limits ───────────────────────────────────────────

/// Longest stay accepted by availability, quote, and booking calls.
pub const MAX_STAY_NIGHTS: i64 = 366;

/// Status records one unit may carry before new bookings are refused.
pub const MAX_RECORDS_PER_UNIT: usize = 4_096;

pub const MAX_REFERENCE_LEN: usize = 128;
pub const MAX_NOTE_LEN: usize = 2_048;
pub const MAX_ASSIGNEE_LEN: usize = 256;

/// Default cleaning window after checkout before a task auto-completes.
pub const DEFAULT_CLEANING_BUFFER_MINS: i64 = 120;

/// Longest cleaning window the engine accepts (one week).
pub const MAX_CLEANING_BUFFER_MINS: i64 = 7 * 24 * 60;

/// Upper bound on a scheduled maintenance window.
pub const MAX_MAINTENANCE_DAYS: i64 = 90;

/// Prefix for references synthesized for maintenance tasks.
pub const MAINTENANCE_REF_PREFIX: &str = "MNT-";

/// Largest journal frame payload accepted on write or replay.
pub const MAX_JOURNAL_ENTRY_BYTES: usize = 16 * 1024 * 1024;
