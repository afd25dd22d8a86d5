use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Category, CreateCategory};

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        display_order: row.get(2)?,
        active: row.get(3)?,
    })
}

fn category_row(conn: &Connection, id: i64) -> Result<Category> {
    let category = conn.query_row(
        "SELECT id, name, display_order, active FROM categories WHERE id = ?1",
        [id],
        category_from_row,
    )?;
    Ok(category)
}

pub fn get_categories(db: &Database, active_only: bool) -> Result<Vec<Category>> {
    db.read(|conn| {
        let sql = if active_only {
            "SELECT id, name, display_order, active FROM categories WHERE active = 1 ORDER BY display_order"
        } else {
            "SELECT id, name, display_order, active FROM categories ORDER BY display_order"
        };

        let mut stmt = conn.prepare(sql)?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(categories)
    })
}

pub fn create_category(db: &Database, data: CreateCategory) -> Result<Category> {
    db.write(|conn| {
        conn.execute(
            "INSERT INTO categories (name, display_order) VALUES (?1, ?2)",
            params![data.name, data.display_order.unwrap_or(0)],
        )?;

        category_row(conn, conn.last_insert_rowid())
    })
}

/// Deleting a category disables every service filed under it and removes
/// the category row. The "HOME" category (any case) is the curated home
/// view and can never be deleted.
pub fn delete_category(db: &Database, id: i64) -> Result<()> {
    let name = db.write(|conn| {
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM categories WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        let name = name.ok_or_else(|| Error::validation("category not found"))?;

        if name.eq_ignore_ascii_case("HOME") {
            return Err(Error::validation("Home category cannot be deleted"));
        }

        conn.execute(
            "UPDATE services SET active = 0, show_on_home = 0 WHERE category = ?1",
            [&name],
        )?;
        conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;

        Ok(name)
    })?;

    db.log_action("category_deleted", json!({ "category_id": id, "name": name }));

    Ok(())
}
