/// Collection names shared by every stage and backend
pub const RAW_COLLECTION: &str = "raw_startups";
pub const CLEAN_COLLECTION: &str = "clean_startups";
pub const AGGREGATED_COLLECTION: &str = "aggregated_sectors";

/// Unique key of the aggregate snapshot
pub const SECTOR_KEY: &str = "sector";

// Accepted range for founding and funding years (inclusive)
pub const MIN_YEAR: i64 = 1900;
pub const MAX_YEAR: i64 = 2030;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_CLOSED: &str = "closed";
pub const STATUS_UNKNOWN: &str = "unknown";

// Input smaller than this is loaded but flagged as a partial extract
pub const MIN_EXPECTED_ROWS: usize = 750_000;
pub const MIN_EXPECTED_COLUMNS: usize = 8;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_LOGGED_REJECTIONS: usize = 10;

pub const TOP_COUNTRIES_LIMIT: usize = 5;
/// Number of trailing founding years compared by the growth heuristic
pub const GROWTH_WINDOW_YEARS: i32 = 3;

/// Get all collections in pipeline order
pub fn pipeline_collections() -> Vec<&'static str> {
    vec![RAW_COLLECTION, CLEAN_COLLECTION, AGGREGATED_COLLECTION]
}
