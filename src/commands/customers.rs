use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CreateCustomer, Customer, UpdateCustomer};

const CUSTOMER_COLUMNS: &str =
    "id, name, phone, email, loyalty_points, visits, notes, created_at, updated_at";

fn customer_from_row(row: &Row) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        loyalty_points: row.get(4)?,
        visits: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn customer_row(conn: &Connection, id: i64) -> Result<Customer> {
    let customer = conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
        [id],
        customer_from_row,
    )?;
    Ok(customer)
}

pub fn get_customers(db: &Database) -> Result<Vec<Customer>> {
    db.read(|conn| {
        let mut stmt =
            conn.prepare(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name"))?;
        let customers = stmt
            .query_map([], customer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(customers)
    })
}

pub fn search_customers(db: &Database, query: &str) -> Result<Vec<Customer>> {
    db.read(|conn| {
        let pattern = format!("%{query}%");
        let mut stmt = conn.prepare(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name LIKE ?1 OR phone LIKE ?1 ORDER BY name LIMIT 20"
        ))?;
        let customers = stmt
            .query_map([&pattern], customer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(customers)
    })
}

pub fn get_customer(db: &Database, id: i64) -> Result<Option<Customer>> {
    db.read(|conn| {
        let customer = conn
            .query_row(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
                [id],
                customer_from_row,
            )
            .optional()?;

        Ok(customer)
    })
}

pub fn create_customer(db: &Database, data: CreateCustomer) -> Result<Customer> {
    db.write(|conn| {
        conn.execute(
            "INSERT INTO customers (name, phone, email, notes) VALUES (?1, ?2, ?3, ?4)",
            params![data.name, data.phone, data.email, data.notes],
        )?;

        customer_row(conn, conn.last_insert_rowid())
    })
}

pub fn update_customer(db: &Database, id: i64, data: UpdateCustomer) -> Result<Customer> {
    db.write(|conn| {
        conn.execute(
            "UPDATE customers SET
                name = COALESCE(?1, name),
                phone = COALESCE(?2, phone),
                email = COALESCE(?3, email),
                notes = COALESCE(?4, notes),
                updated_at = datetime('now', 'localtime')
             WHERE id = ?5",
            params![data.name, data.phone, data.email, data.notes, id],
        )?;

        if conn.changes() == 0 {
            return Err(Error::validation("customer not found"));
        }

        customer_row(conn, id)
    })
}

/// Removes the customer but keeps their transaction history: historical
/// bills are detached (customer reference nulled), never deleted.
pub fn delete_customer(db: &Database, id: i64) -> Result<()> {
    let (name, phone) = db.write(|conn| {
        let found: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT name, phone FROM customers WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (name, phone) = found.ok_or_else(|| Error::validation("customer not found"))?;

        conn.execute(
            "UPDATE bills SET customer_id = NULL WHERE customer_id = ?1",
            [id],
        )?;
        conn.execute("DELETE FROM customers WHERE id = ?1", [id])?;

        Ok((name, phone))
    })?;

    db.log_action(
        "customer_deleted",
        json!({ "customer_id": id, "name": name, "phone": phone }),
    );

    Ok(())
}
