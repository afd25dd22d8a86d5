use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// The persistent store. The live database is an in-memory SQLite
/// connection; the backing file is refreshed with a full-image copy after
/// every mutation, on the autosave tick, and on close.
pub struct Database {
    shared: Arc<Shared>,
    autosave: Mutex<Option<Autosave>>,
}

struct Shared {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

struct Autosave {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Database {
    /// Open (or create) the database at `path` with the default autosave
    /// cadence. Creates the parent directory if absent, loads an existing
    /// image, applies schema and migrations, and seeds default data on
    /// first run. Startup failures propagate.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_autosave(path, Some(AUTOSAVE_INTERVAL))
    }

    pub fn open_with_autosave(
        path: impl Into<PathBuf>,
        autosave_interval: Option<Duration>,
    ) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let conn = load_image(&path)?;
        let shared = Arc::new(Shared {
            path,
            conn: Mutex::new(Some(conn)),
        });
        shared.save()?;

        let autosave = autosave_interval.map(|interval| spawn_autosave(shared.clone(), interval));
        info!(path = %shared.path.display(), "database initialized");

        Ok(Database {
            shared,
            autosave: Mutex::new(autosave),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn action_log_path(&self) -> PathBuf {
        self.shared.path.with_file_name("actions.log")
    }

    /// Run a read-only query against the live connection.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.shared.conn.lock().map_err(|_| Error::Lock)?;
        let conn = guard.as_ref().ok_or(Error::Closed)?;
        f(conn)
    }

    /// Run a mutating operation, then flush the image to the backing file.
    /// Save failures are logged, not fatal: the image is retried on the
    /// next save or on close.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.shared.conn.lock().map_err(|_| Error::Lock)?;
        let conn = guard.as_ref().ok_or(Error::Closed)?;
        let value = f(conn)?;
        if let Err(err) = save_image(conn, &self.shared.path) {
            warn!(%err, "write-through save failed");
        }
        Ok(value)
    }

    /// Explicit durable save. Unlike the write-through path, failures
    /// propagate to the caller.
    pub fn checkpoint(&self) -> Result<()> {
        self.read(|conn| save_image(conn, &self.shared.path))
    }

    /// Write a full snapshot to an arbitrary path, independent of the
    /// backing file.
    pub fn backup(&self, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref();
        self.read(|conn| save_image(conn, dest))?;
        info!(path = %dest.display(), "database backup written");
        Ok(())
    }

    /// Swap the live database for the image at `backup_path`. The previous
    /// live file is kept as a `.temp` sibling until the restore succeeds so
    /// a failed restore rolls back to it.
    pub fn restore(&self, backup_path: impl AsRef<Path>) -> Result<()> {
        let backup_path = backup_path.as_ref();
        let mut guard = self.shared.conn.lock().map_err(|_| Error::Lock)?;
        let conn = guard.as_ref().ok_or(Error::Closed)?;

        let live = &self.shared.path;
        save_image(conn, live)?;

        let temp = temp_path(live);
        fs::copy(live, &temp)?;

        let swapped = fs::copy(backup_path, live)
            .map_err(Error::from)
            .and_then(|_| load_image(live));

        match swapped {
            Ok(fresh) => {
                *guard = Some(fresh);
                let _ = fs::remove_file(&temp);
                info!(path = %backup_path.display(), "database restored from backup");
                Ok(())
            }
            Err(err) => {
                fs::copy(&temp, live)?;
                *guard = Some(load_image(live)?);
                let _ = fs::remove_file(&temp);
                Err(err)
            }
        }
    }

    /// Stop the autosave timer, perform a final save, and release the
    /// connection. Safe to call more than once; also runs on drop.
    pub fn close(&self) {
        if let Some(autosave) = self.autosave.lock().ok().and_then(|mut g| g.take()) {
            drop(autosave.stop);
            let _ = autosave.handle.join();
        }

        match self.shared.conn.lock() {
            Ok(mut guard) => {
                if let Some(conn) = guard.take() {
                    if let Err(err) = save_image(&conn, &self.shared.path) {
                        warn!(%err, "final save on close failed");
                    }
                    info!("database closed");
                }
            }
            Err(_) => warn!("database lock poisoned during close"),
        }
    }

    /// Append an entry to the side-channel action log. Write failures are
    /// logged and swallowed, never propagated.
    pub(crate) fn log_action(&self, action: &str, details: Value) {
        let mut entry = serde_json::Map::new();
        entry.insert(
            "timestamp".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        entry.insert("action".to_string(), Value::String(action.to_string()));
        if let Value::Object(fields) = details {
            entry.extend(fields);
        }
        let line = Value::Object(entry).to_string();

        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.action_log_path())
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(err) = result {
            warn!(%err, "failed to write action log");
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    fn save(&self) -> Result<()> {
        let guard = self.conn.lock().map_err(|_| Error::Lock)?;
        match guard.as_ref() {
            Some(conn) => save_image(conn, &self.path),
            None => Ok(()),
        }
    }
}

fn spawn_autosave(shared: Arc<Shared>, interval: Duration) -> Autosave {
    let (stop, ticks) = mpsc::channel::<()>();
    let handle = std::thread::spawn(move || loop {
        match ticks.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if let Err(err) = shared.save() {
                    warn!(%err, "autosave failed");
                }
            }
            // Stop requested or the handle was dropped.
            _ => break,
        }
    });
    Autosave { stop, handle }
}

/// Load the image at `path` into a fresh in-memory connection (empty when
/// the file does not exist yet), then apply schema, migrations and seeds.
fn load_image(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    // The bundled SQLite is compiled with SQLITE_DEFAULT_FOREIGN_KEYS=1,
    // which flips foreign-key enforcement on. Restore SQLite's standard
    // default (off) that this schema was written against: line items carry
    // denormalized snapshots and intentionally never join back to the catalog.
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    if path.exists() {
        let src = Connection::open(path)?;
        copy_image(&src, &mut conn)?;
    }
    create_tables(&conn)?;
    migrate(&conn)?;
    seed_defaults(&conn)?;
    Ok(conn)
}

/// Serialize the in-memory database over the file at `path`.
fn save_image(conn: &Connection, path: &Path) -> Result<()> {
    let mut dest = Connection::open(path)?;
    copy_image(conn, &mut dest)?;
    Ok(())
}

fn copy_image(src: &Connection, dest: &mut Connection) -> Result<()> {
    let backup = Backup::new(src, dest)?;
    backup.run_to_completion(64, Duration::from_millis(5), None)?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Service catalog
        CREATE TABLE IF NOT EXISTS services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL DEFAULT 0,
            category TEXT NOT NULL DEFAULT 'General',
            show_on_home INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT DEFAULT (datetime('now', 'localtime'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            display_order INTEGER DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT UNIQUE,
            email TEXT,
            loyalty_points INTEGER DEFAULT 0,
            visits INTEGER DEFAULT 0,
            notes TEXT,
            created_at TEXT DEFAULT (datetime('now', 'localtime')),
            updated_at TEXT DEFAULT (datetime('now', 'localtime'))
        );

        CREATE TABLE IF NOT EXISTS staff (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            commission_rate REAL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            pin TEXT,
            role TEXT DEFAULT 'staff',
            photo_path TEXT,
            created_at TEXT DEFAULT (datetime('now', 'localtime'))
        );

        CREATE TABLE IF NOT EXISTS bills (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER,
            subtotal REAL NOT NULL DEFAULT 0,
            discount_amount REAL DEFAULT 0,
            discount_type TEXT,
            total REAL NOT NULL DEFAULT 0,
            payment_method TEXT NOT NULL,
            payment_status TEXT DEFAULT 'completed',
            notes TEXT,
            created_at TEXT DEFAULT (datetime('now', 'localtime')),
            FOREIGN KEY (customer_id) REFERENCES customers(id)
        );

        -- Line items carry the service/staff display fields captured at
        -- sale time; historical bills never join back to the catalog.
        CREATE TABLE IF NOT EXISTS bill_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bill_id INTEGER NOT NULL,
            service_id INTEGER NOT NULL,
            service_name TEXT NOT NULL,
            price REAL NOT NULL,
            quantity INTEGER DEFAULT 1,
            staff_id INTEGER,
            staff_name TEXT,
            notes TEXT,
            FOREIGN KEY (bill_id) REFERENCES bills(id) ON DELETE CASCADE,
            FOREIGN KEY (service_id) REFERENCES services(id),
            FOREIGN KEY (staff_id) REFERENCES staff(id)
        );

        CREATE TABLE IF NOT EXISTS staff_time_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            staff_id INTEGER NOT NULL,
            clock_in TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
            clock_out TEXT,
            created_at TEXT DEFAULT (datetime('now', 'localtime')),
            FOREIGN KEY (staff_id) REFERENCES staff(id)
        );

        CREATE TABLE IF NOT EXISTS reservations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_name TEXT,
            customer_phone TEXT,
            staff_id INTEGER,
            service_name TEXT,
            notes TEXT,
            status TEXT DEFAULT 'scheduled',
            start_time TEXT NOT NULL,
            end_time TEXT,
            created_at TEXT DEFAULT (datetime('now', 'localtime')),
            FOREIGN KEY (staff_id) REFERENCES staff(id)
        );

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_services_category ON services(category);
        CREATE INDEX IF NOT EXISTS idx_services_active ON services(active);
        CREATE INDEX IF NOT EXISTS idx_customers_phone ON customers(phone);
        CREATE INDEX IF NOT EXISTS idx_bills_created ON bills(created_at);
        CREATE INDEX IF NOT EXISTS idx_bills_customer ON bills(customer_id);
        CREATE INDEX IF NOT EXISTS idx_bill_items_bill ON bill_items(bill_id);
        CREATE INDEX IF NOT EXISTS idx_staff_time_logs_staff ON staff_time_logs(staff_id);
        CREATE INDEX IF NOT EXISTS idx_staff_time_logs_clock_in ON staff_time_logs(clock_in);
        CREATE INDEX IF NOT EXISTS idx_reservations_start_time ON reservations(start_time);
        ",
    )?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<()> {
    // Columns added after initial release.
    ensure_column(conn, "services", "show_on_home", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(conn, "staff", "photo_path", "TEXT")?;

    // Legacy ordering repair for databases created before 'Other' moved.
    conn.execute(
        "UPDATE categories SET display_order = 7 WHERE name = 'Other' AND display_order = 99",
        [],
    )?;

    Ok(())
}

/// Add `column` to `table` if the live schema does not have it yet.
/// Idempotent; safe to run on every startup and mid-session. Identifiers
/// come from internal call sites only, never from external input.
pub(crate) fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<_>>()?;

    if !columns.iter().any(|c| c == column) {
        conn.execute(
            &format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"),
            [],
        )?;
    }

    Ok(())
}

/// First-run data. Each table's seed check is independent: existing
/// categories never block seeding of an empty settings table, and vice
/// versa.
fn seed_defaults(conn: &Connection) -> Result<()> {
    let categories: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    if categories == 0 {
        let defaults = [
            ("HOME", 0),
            ("Hair", 1),
            ("Facial", 2),
            ("Makeup", 3),
            ("Waxing", 4),
            ("Other", 5),
        ];
        for (name, display_order) in defaults {
            conn.execute(
                "INSERT INTO categories (name, display_order) VALUES (?1, ?2)",
                rusqlite::params![name, display_order],
            )?;
        }
    }

    let services: i64 = conn.query_row("SELECT COUNT(*) FROM services", [], |row| row.get(0))?;
    if services == 0 {
        let defaults = [
            ("Haircut - Women", 50.0, "Hair"),
            ("Haircut - Men", 30.0, "Hair"),
            ("Hair Color", 80.0, "Hair"),
            ("Highlights", 120.0, "Hair"),
            ("Blowout", 40.0, "Hair"),
            ("Facial - Basic", 60.0, "Facial"),
            ("Facial - Deep Clean", 85.0, "Facial"),
            ("Makeup - Basic", 50.0, "Makeup"),
            ("Makeup - Bridal", 150.0, "Makeup"),
            ("Eyebrow Wax", 15.0, "Waxing"),
            ("Lip Wax", 10.0, "Waxing"),
            ("Full Leg Wax", 60.0, "Waxing"),
        ];
        for (name, price, category) in defaults {
            conn.execute(
                "INSERT INTO services (name, price, category, show_on_home) VALUES (?1, ?2, ?3, 0)",
                rusqlite::params![name, price, category],
            )?;
        }
    }

    let staff: i64 = conn.query_row("SELECT COUNT(*) FROM staff", [], |row| row.get(0))?;
    if staff == 0 {
        conn.execute(
            "INSERT INTO staff (name, commission_rate, role, pin) VALUES ('Admin', 0, 'admin', '12345')",
            [],
        )?;
        conn.execute(
            "INSERT INTO staff (name, commission_rate, role) VALUES ('Staff 1', 10, 'staff')",
            [],
        )?;
        conn.execute(
            "INSERT INTO staff (name, commission_rate, role) VALUES ('Staff 2', 10, 'staff')",
            [],
        )?;
    }

    let settings: i64 = conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
    if settings == 0 {
        let defaults = [
            ("business_name", "My Salon"),
            ("admin_pin", "12345"),
            ("currency_symbol", "$"),
            ("tax_rate", "0"),
        ];
        for (key, value) in defaults {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )?;
        }
    }

    Ok(())
}

fn temp_path(live: &Path) -> PathBuf {
    let mut name = live
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "pos.db".into());
    name.push(".temp");
    live.with_file_name(name)
}
