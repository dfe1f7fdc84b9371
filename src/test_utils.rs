/// # Test Utilities Module
///
/// Fixtures for tests that need a host directory with real database files.
///
/// A seeded host contains:
/// - `shop.db` with an `items` table of three rows
/// - `archive.db` with a `snapshots` table of one row

use crate::config::ConnectionConfig;
use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

const SHOP_SCHEMA: &str = "
    CREATE TABLE items (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        price REAL,
        stock INTEGER DEFAULT 0
    );
    INSERT INTO items (id, name, price, stock) VALUES (1, 'lamp', 19.5, 4);
    INSERT INTO items (id, name, price, stock) VALUES (5, 'chair', 45.0, 0);
    INSERT INTO items (id, name, price, stock) VALUES (9, 'desk', NULL, 2);
";

const ARCHIVE_SCHEMA: &str = "
    CREATE TABLE snapshots (label TEXT NOT NULL);
    INSERT INTO snapshots (label) VALUES ('2015-q1');
";

/// Temporary host directory removed on drop
pub struct SeededHost {
    dir: TempDir,
}

impl SeededHost {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp host");
        for (name, schema) in [("shop", SHOP_SCHEMA), ("archive", ARCHIVE_SCHEMA)] {
            let conn = Connection::open(dir.path().join(format!("{}.db", name)))
                .expect("create seeded database");
            conn.execute_batch(schema).expect("seed database");
        }
        SeededHost { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Configuration pointing at `dbname` on this host
    pub fn config(&self, dbname: &str) -> ConnectionConfig {
        ConnectionConfig::new(self.path().to_string_lossy(), "student", "secret", dbname)
    }
}
