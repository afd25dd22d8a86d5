use rusqlite::{params, Connection, Row};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CreateReservation, Reservation, UpdateReservation};

const STATUSES: [&str; 4] = ["scheduled", "confirmed", "completed", "cancelled"];

const RESERVATION_SELECT: &str = "SELECT r.id, r.customer_name, r.customer_phone, r.staff_id, s.name,
            r.service_name, r.notes, r.status, r.start_time, r.end_time, r.created_at
     FROM reservations r
     LEFT JOIN staff s ON r.staff_id = s.id";

fn reservation_from_row(row: &Row) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_phone: row.get(2)?,
        staff_id: row.get(3)?,
        staff_name: row.get(4)?,
        service_name: row.get(5)?,
        notes: row.get(6)?,
        status: row
            .get::<_, Option<String>>(7)?
            .unwrap_or_else(|| "scheduled".to_string()),
        start_time: row.get(8)?,
        end_time: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn reservation_row(conn: &Connection, id: i64) -> Result<Reservation> {
    let reservation = conn.query_row(
        &format!("{RESERVATION_SELECT} WHERE r.id = ?1"),
        [id],
        reservation_from_row,
    )?;
    Ok(reservation)
}

fn validate_status(status: &str) -> Result<()> {
    if STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "invalid reservation status: {status}"
        )))
    }
}

/// Reservations whose start time falls on the given calendar date (local
/// date match, not exact timestamp), earliest first.
pub fn get_reservations_by_date(db: &Database, date: &str) -> Result<Vec<Reservation>> {
    db.read(|conn| {
        let mut stmt = conn.prepare(&format!(
            "{RESERVATION_SELECT}
             WHERE date(r.start_time) = date(?1)
             ORDER BY r.start_time ASC"
        ))?;
        let reservations = stmt
            .query_map([date], reservation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(reservations)
    })
}

pub fn create_reservation(db: &Database, data: CreateReservation) -> Result<Reservation> {
    let status = data.status.unwrap_or_else(|| "scheduled".to_string());
    validate_status(&status)?;

    db.write(|conn| {
        if let Some(staff_id) = data.staff_id {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM staff WHERE id = ?1",
                [staff_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(Error::validation("staff member not found"));
            }
        }

        conn.execute(
            "INSERT INTO reservations (customer_name, customer_phone, staff_id, service_name, notes, status, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                data.customer_name,
                data.customer_phone,
                data.staff_id,
                data.service_name,
                data.notes,
                status,
                data.start_time,
                data.end_time
            ],
        )?;

        reservation_row(conn, conn.last_insert_rowid())
    })
}

pub fn update_reservation(db: &Database, id: i64, data: UpdateReservation) -> Result<Reservation> {
    if let Some(status) = &data.status {
        validate_status(status)?;
    }

    db.write(|conn| {
        conn.execute(
            "UPDATE reservations SET
                customer_name = COALESCE(?1, customer_name),
                customer_phone = COALESCE(?2, customer_phone),
                staff_id = COALESCE(?3, staff_id),
                service_name = COALESCE(?4, service_name),
                notes = COALESCE(?5, notes),
                status = COALESCE(?6, status),
                start_time = COALESCE(?7, start_time),
                end_time = COALESCE(?8, end_time)
             WHERE id = ?9",
            params![
                data.customer_name,
                data.customer_phone,
                data.staff_id,
                data.service_name,
                data.notes,
                data.status,
                data.start_time,
                data.end_time,
                id
            ],
        )?;

        if conn.changes() == 0 {
            return Err(Error::validation("reservation not found"));
        }

        reservation_row(conn, id)
    })
}
