use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{ensure_column, Database};
use crate::error::{Error, Result};
use crate::models::{CreateService, Service, UpdateService};

const SERVICE_COLUMNS: &str =
    "id, name, price, category, show_on_home, active, created_at, updated_at";

fn service_from_row(row: &Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        category: row.get(3)?,
        show_on_home: row.get(4)?,
        active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn service_row(conn: &Connection, id: i64) -> Result<Service> {
    let service = conn.query_row(
        &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
        [id],
        service_from_row,
    )?;
    Ok(service)
}

fn category_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_services(db: &Database, active_only: bool) -> Result<Vec<Service>> {
    db.read(|conn| {
        ensure_column(conn, "services", "show_on_home", "INTEGER NOT NULL DEFAULT 0")?;

        let sql = if active_only {
            format!("SELECT {SERVICE_COLUMNS} FROM services WHERE active = 1 ORDER BY category, name")
        } else {
            format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY category, name")
        };

        let mut stmt = conn.prepare(&sql)?;
        let services = stmt
            .query_map([], service_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(services)
    })
}

/// Services for one category tab. "HOME" (any case) is not a real
/// grouping: it returns the curated home view, i.e. active services with
/// `show_on_home` set, whatever their actual category.
pub fn get_services_by_category(db: &Database, category: &str) -> Result<Vec<Service>> {
    db.read(|conn| {
        ensure_column(conn, "services", "show_on_home", "INTEGER NOT NULL DEFAULT 0")?;

        let mut stmt;
        let rows = if category.eq_ignore_ascii_case("HOME") {
            stmt = conn.prepare(&format!(
                "SELECT {SERVICE_COLUMNS} FROM services WHERE show_on_home = 1 AND active = 1 ORDER BY name"
            ))?;
            stmt.query_map([], service_from_row)?
        } else {
            stmt = conn.prepare(&format!(
                "SELECT {SERVICE_COLUMNS} FROM services WHERE category = ?1 AND active = 1 ORDER BY name"
            ))?;
            stmt.query_map([category], service_from_row)?
        };

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}

pub fn get_service(db: &Database, id: i64) -> Result<Option<Service>> {
    db.read(|conn| {
        ensure_column(conn, "services", "show_on_home", "INTEGER NOT NULL DEFAULT 0")?;

        let service = conn
            .query_row(
                &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
                [id],
                service_from_row,
            )
            .optional()?;

        Ok(service)
    })
}

pub fn create_service(db: &Database, data: CreateService) -> Result<Service> {
    db.write(|conn| {
        ensure_column(conn, "services", "show_on_home", "INTEGER NOT NULL DEFAULT 0")?;

        if !category_exists(conn, &data.category)? {
            return Err(Error::validation(format!(
                "unknown category: {}",
                data.category
            )));
        }

        conn.execute(
            "INSERT INTO services (name, price, category, show_on_home, active) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                data.name,
                data.price,
                data.category,
                data.show_on_home.unwrap_or(false),
                data.active.unwrap_or(true)
            ],
        )?;

        service_row(conn, conn.last_insert_rowid())
    })
}

/// Partial patch: unset fields keep their previous value.
pub fn update_service(db: &Database, id: i64, data: UpdateService) -> Result<Service> {
    db.write(|conn| {
        ensure_column(conn, "services", "show_on_home", "INTEGER NOT NULL DEFAULT 0")?;

        if let Some(category) = &data.category {
            if !category_exists(conn, category)? {
                return Err(Error::validation(format!("unknown category: {category}")));
            }
        }

        conn.execute(
            "UPDATE services SET
                name = COALESCE(?1, name),
                price = COALESCE(?2, price),
                category = COALESCE(?3, category),
                show_on_home = COALESCE(?4, show_on_home),
                active = COALESCE(?5, active),
                updated_at = datetime('now', 'localtime')
             WHERE id = ?6",
            params![
                data.name,
                data.price,
                data.category,
                data.show_on_home,
                data.active,
                id
            ],
        )?;

        if conn.changes() == 0 {
            return Err(Error::validation("service not found"));
        }

        service_row(conn, id)
    })
}

/// Soft delete. The row is kept for bill history; it only disappears from
/// active listings.
pub fn delete_service(db: &Database, id: i64) -> Result<()> {
    db.write(|conn| {
        conn.execute("UPDATE services SET active = 0 WHERE id = ?1", [id])?;

        if conn.changes() == 0 {
            return Err(Error::validation("service not found"));
        }

        Ok(())
    })
}
