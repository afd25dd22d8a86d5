use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{ensure_column, Database};
use crate::error::{Error, Result};
use crate::models::{ClockStatus, CreateStaff, Staff, TimeLog, UpdateStaff};

// The PIN column is intentionally absent from every staff read.
const STAFF_COLUMNS: &str = "id, name, commission_rate, active, role, photo_path";

const ROLES: [&str; 2] = ["staff", "admin"];

fn staff_from_row(row: &Row) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        name: row.get(1)?,
        commission_rate: row.get(2)?,
        active: row.get(3)?,
        role: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "staff".to_string()),
        photo_path: row.get(5)?,
    })
}

fn staff_row(conn: &Connection, id: i64) -> Result<Staff> {
    let member = conn.query_row(
        &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
        [id],
        staff_from_row,
    )?;
    Ok(member)
}

fn time_log_from_row(row: &Row) -> rusqlite::Result<TimeLog> {
    Ok(TimeLog {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        clock_in: row.get(2)?,
        clock_out: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn validate_role(role: &str) -> Result<()> {
    if ROLES.contains(&role) {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid role: {role}")))
    }
}

pub fn get_staff(db: &Database, active_only: bool) -> Result<Vec<Staff>> {
    db.read(|conn| {
        ensure_column(conn, "staff", "photo_path", "TEXT")?;

        let sql = if active_only {
            format!("SELECT {STAFF_COLUMNS} FROM staff WHERE active = 1 ORDER BY name")
        } else {
            format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY name")
        };

        let mut stmt = conn.prepare(&sql)?;
        let staff = stmt
            .query_map([], staff_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(staff)
    })
}

pub fn get_staff_member(db: &Database, id: i64) -> Result<Option<Staff>> {
    db.read(|conn| {
        ensure_column(conn, "staff", "photo_path", "TEXT")?;

        let member = conn
            .query_row(
                &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
                [id],
                staff_from_row,
            )
            .optional()?;

        Ok(member)
    })
}

pub fn create_staff(db: &Database, data: CreateStaff) -> Result<Staff> {
    let role = data.role.unwrap_or_else(|| "staff".to_string());
    validate_role(&role)?;

    db.write(|conn| {
        ensure_column(conn, "staff", "photo_path", "TEXT")?;

        conn.execute(
            "INSERT INTO staff (name, commission_rate, role, pin, photo_path) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                data.name,
                data.commission_rate.unwrap_or(0.0),
                role,
                data.pin,
                data.photo_path
            ],
        )?;

        staff_row(conn, conn.last_insert_rowid())
    })
}

/// Partial patch; soft delete is `active = false` through here.
pub fn update_staff(db: &Database, id: i64, data: UpdateStaff) -> Result<Staff> {
    if let Some(role) = &data.role {
        validate_role(role)?;
    }

    db.write(|conn| {
        ensure_column(conn, "staff", "photo_path", "TEXT")?;

        conn.execute(
            "UPDATE staff SET
                name = COALESCE(?1, name),
                commission_rate = COALESCE(?2, commission_rate),
                active = COALESCE(?3, active),
                role = COALESCE(?4, role),
                photo_path = COALESCE(?5, photo_path)
             WHERE id = ?6",
            params![
                data.name,
                data.commission_rate,
                data.active,
                data.role,
                data.photo_path,
                id
            ],
        )?;

        if conn.changes() == 0 {
            return Err(Error::validation("staff member not found"));
        }

        staff_row(conn, id)
    })
}

// ----- Time clock -----

/// Open log plus first clock-in / last clock-out for one staff member on
/// one calendar date. The repository does not enforce "one open log per
/// staff"; the caller finds the open log through here.
pub fn get_staff_clock_status(db: &Database, staff_id: i64, date: &str) -> Result<ClockStatus> {
    db.read(|conn| {
        let open_log = conn
            .query_row(
                "SELECT id, staff_id, clock_in, clock_out, created_at
                 FROM staff_time_logs
                 WHERE staff_id = ?1 AND date(clock_in) = date(?2) AND clock_out IS NULL
                 ORDER BY clock_in DESC LIMIT 1",
                params![staff_id, date],
                time_log_from_row,
            )
            .optional()?;

        let first_clock_in: Option<String> = conn.query_row(
            "SELECT MIN(clock_in) FROM staff_time_logs WHERE staff_id = ?1 AND date(clock_in) = date(?2)",
            params![staff_id, date],
            |row| row.get(0),
        )?;

        let last_clock_out: Option<String> = conn.query_row(
            "SELECT MAX(clock_out) FROM staff_time_logs WHERE staff_id = ?1 AND date(clock_in) = date(?2)",
            params![staff_id, date],
            |row| row.get(0),
        )?;

        Ok(ClockStatus {
            open_log,
            first_clock_in,
            last_clock_out,
        })
    })
}

pub fn clock_in_staff(db: &Database, staff_id: i64) -> Result<TimeLog> {
    db.write(|conn| {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM staff WHERE id = ?1",
            [staff_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(Error::validation("staff member not found"));
        }

        conn.execute(
            "INSERT INTO staff_time_logs (staff_id, clock_in) VALUES (?1, datetime('now', 'localtime'))",
            [staff_id],
        )?;

        let id = conn.last_insert_rowid();
        let log = conn.query_row(
            "SELECT id, staff_id, clock_in, clock_out, created_at FROM staff_time_logs WHERE id = ?1",
            [id],
            time_log_from_row,
        )?;
        Ok(log)
    })
}

pub fn clock_out_staff(db: &Database, log_id: i64) -> Result<TimeLog> {
    db.write(|conn| {
        conn.execute(
            "UPDATE staff_time_logs SET clock_out = datetime('now', 'localtime') WHERE id = ?1",
            [log_id],
        )?;

        if conn.changes() == 0 {
            return Err(Error::validation("time log not found"));
        }

        let log = conn.query_row(
            "SELECT id, staff_id, clock_in, clock_out, created_at FROM staff_time_logs WHERE id = ?1",
            [log_id],
            time_log_from_row,
        )?;
        Ok(log)
    })
}
