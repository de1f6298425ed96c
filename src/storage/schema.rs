//! Database schema definitions
//!
//! Every table is keyed by the `crawl:<kind>:<id>` string and carries an
//! `expires_at` unix timestamp. Rows past it are invisible to reads.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Visited / claimed URLs (write-once)
CREATE TABLE IF NOT EXISTS visited (
    key TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    status_code INTEGER,
    crawled_at TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_visited_expires ON visited(expires_at);

-- robots.txt bodies per scheme+host
CREATE TABLE IF NOT EXISTS robots (
    key TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

-- Normalized page content
CREATE TABLE IF NOT EXISTS content (
    key TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    content_type TEXT NOT NULL,
    cached_at TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

-- Queue sets: one row per serialized {url, depth} member
CREATE TABLE IF NOT EXISTS queue_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    queue TEXT NOT NULL,
    member TEXT NOT NULL,
    UNIQUE(queue, member)
);

CREATE INDEX IF NOT EXISTS idx_queue_items_queue ON queue_items(queue);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
