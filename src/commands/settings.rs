use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};
use subtle::ConstantTimeEq;

use crate::db::Database;
use crate::error::Result;

pub fn get_setting(db: &Database, key: &str) -> Result<Option<String>> {
    db.read(|conn| {
        let value: Option<Option<String>> = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value.flatten())
    })
}

pub fn set_setting(db: &Database, key: &str, value: &str) -> Result<()> {
    db.write(|conn| {
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    })
}

pub fn get_settings(db: &Database) -> Result<HashMap<String, String>> {
    db.read(|conn| {
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut settings = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            settings.insert(key, value.unwrap_or_default());
        }

        Ok(settings)
    })
}

/// Check a submitted PIN against the `admin_pin` setting. The comparison
/// is constant-time; lockout and rate limiting are the host's concern.
pub fn verify_admin_pin(db: &Database, pin: &str) -> Result<bool> {
    let stored = get_setting(db, "admin_pin")?.unwrap_or_default();
    Ok(bool::from(stored.as_bytes().ct_eq(pin.as_bytes())))
}
