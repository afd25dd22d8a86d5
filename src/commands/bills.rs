use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Bill, BillItem, BillQuery, BillWithItems, CreateBill};

const BILL_SELECT: &str = "SELECT b.id, b.customer_id, c.name, c.phone, b.subtotal,
            b.discount_amount, b.discount_type, b.total, b.payment_method,
            b.payment_status, b.notes, b.created_at
     FROM bills b
     LEFT JOIN customers c ON b.customer_id = c.id";

fn bill_from_row(row: &Row) -> rusqlite::Result<Bill> {
    Ok(Bill {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        customer_name: row.get(2)?,
        customer_phone: row.get(3)?,
        subtotal: row.get(4)?,
        discount_amount: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
        discount_type: row.get(6)?,
        total: row.get(7)?,
        payment_method: row.get(8)?,
        payment_status: row
            .get::<_, Option<String>>(9)?
            .unwrap_or_else(|| "completed".to_string()),
        notes: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn bill_item_from_row(row: &Row) -> rusqlite::Result<BillItem> {
    Ok(BillItem {
        id: row.get(0)?,
        bill_id: row.get(1)?,
        service_id: row.get(2)?,
        service_name: row.get(3)?,
        price: row.get(4)?,
        quantity: row.get::<_, Option<i64>>(5)?.unwrap_or(1),
        staff_id: row.get(6)?,
        staff_name: row.get(7)?,
        notes: row.get(8)?,
    })
}

fn bill_items(conn: &Connection, bill_id: i64) -> Result<Vec<BillItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, service_id, service_name, price, quantity, staff_id, staff_name, notes
         FROM bill_items WHERE bill_id = ?1",
    )?;
    let items = stmt
        .query_map([bill_id], bill_item_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Checkout. One transaction covers the bill header, its line items (with
/// service/staff display fields captured at sale time), and the customer
/// visit/loyalty accrual; any failure rolls the whole bill back.
///
/// `subtotal` is computed from the items; `total` is the subtotal minus
/// the discount, clamped at zero. Loyalty accrues one point per ten
/// currency units of the final total, floored.
pub fn create_bill(db: &Database, data: CreateBill) -> Result<BillWithItems> {
    if data.items.is_empty() {
        return Err(Error::validation("a bill requires at least one line item"));
    }

    let bill_id = db.write(|conn| {
        let tx = conn.unchecked_transaction()?;

        let discount = data.discount_amount.unwrap_or(0.0);
        let subtotal: f64 = data
            .items
            .iter()
            .map(|item| item.price * item.quantity.unwrap_or(1) as f64)
            .sum();
        let total = (subtotal - discount).max(0.0);

        tx.execute(
            "INSERT INTO bills (customer_id, subtotal, discount_amount, discount_type, total, payment_method, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                data.customer_id,
                subtotal,
                discount,
                data.discount_type,
                total,
                data.payment_method,
                data.notes
            ],
        )?;
        let bill_id = tx.last_insert_rowid();

        for item in &data.items {
            let service_name: String = tx
                .query_row(
                    "SELECT name FROM services WHERE id = ?1",
                    [item.service_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| {
                    Error::validation(format!("service not found: {}", item.service_id))
                })?;

            let staff_name: Option<String> = match item.staff_id {
                Some(staff_id) => Some(
                    tx.query_row(
                        "SELECT name FROM staff WHERE id = ?1",
                        [staff_id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(|| {
                        Error::validation(format!("staff member not found: {staff_id}"))
                    })?,
                ),
                None => None,
            };

            tx.execute(
                "INSERT INTO bill_items (bill_id, service_id, service_name, price, quantity, staff_id, staff_name, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    bill_id,
                    item.service_id,
                    service_name,
                    item.price,
                    item.quantity.unwrap_or(1),
                    item.staff_id,
                    staff_name,
                    item.notes
                ],
            )?;
        }

        if let Some(customer_id) = data.customer_id {
            let loyalty_points = (total / 10.0).floor() as i64;
            tx.execute(
                "UPDATE customers SET
                    visits = visits + 1,
                    loyalty_points = loyalty_points + ?1,
                    updated_at = datetime('now', 'localtime')
                 WHERE id = ?2",
                params![loyalty_points, customer_id],
            )?;
            if tx.changes() == 0 {
                return Err(Error::validation(format!(
                    "customer not found: {customer_id}"
                )));
            }
        }

        tx.commit()?;
        Ok(bill_id)
    })?;

    get_bill(db, bill_id)?.ok_or_else(|| Error::validation("bill not found"))
}

pub fn get_bill(db: &Database, id: i64) -> Result<Option<BillWithItems>> {
    db.read(|conn| {
        let bill = conn
            .query_row(&format!("{BILL_SELECT} WHERE b.id = ?1"), [id], bill_from_row)
            .optional()?;

        let Some(bill) = bill else {
            return Ok(None);
        };

        let items = bill_items(conn, bill.id)?;
        Ok(Some(BillWithItems { bill, items }))
    })
}

/// Bill history, newest first, optionally constrained to a calendar date
/// range. Items are not included; use `get_bill` for one receipt.
pub fn get_bills(db: &Database, query: BillQuery) -> Result<Vec<Bill>> {
    db.read(|conn| {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);

        let bills = if let (Some(start), Some(end)) = (&query.start_date, &query.end_date) {
            let mut stmt = conn.prepare(&format!(
                "{BILL_SELECT}
                 WHERE date(b.created_at) BETWEEN date(?1) AND date(?2)
                 ORDER BY b.created_at DESC LIMIT ?3 OFFSET ?4"
            ))?;
            let rows = stmt.query_map(params![start, end, limit, offset], bill_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!(
                "{BILL_SELECT} ORDER BY b.created_at DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt.query_map(params![limit, offset], bill_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        Ok(bills)
    })
}
