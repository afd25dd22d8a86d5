use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::params;

use crate::commands::reservations::get_reservations_by_date;
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    DailyJob, DailySummary, PaymentMethodSummary, StaffDailyRow, StaffPayment, TopService,
};

/// Aggregate view of one calendar day's bills: headline numbers, a
/// per-payment-method breakdown, and the ten best-selling services.
pub fn get_daily_summary(db: &Database, date: &str) -> Result<DailySummary> {
    db.read(|conn| {
        let (transaction_count, total_sales, total_discounts, average_sale) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(total), 0),
                    COALESCE(SUM(discount_amount), 0),
                    COALESCE(AVG(total), 0)
             FROM bills
             WHERE date(created_at) = date(?1)",
            [date],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT payment_method, COUNT(*) as count, SUM(total) as total
             FROM bills
             WHERE date(created_at) = date(?1)
             GROUP BY payment_method",
        )?;
        let by_payment_method = stmt
            .query_map([date], |row| {
                Ok(PaymentMethodSummary {
                    payment_method: row.get(0)?,
                    count: row.get(1)?,
                    total: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT bi.service_name, SUM(bi.quantity) as quantity, SUM(bi.price * bi.quantity) as revenue
             FROM bill_items bi
             JOIN bills b ON bi.bill_id = b.id
             WHERE date(b.created_at) = date(?1)
             GROUP BY bi.service_id
             ORDER BY quantity DESC
             LIMIT 10",
        )?;
        let top_services = stmt
            .query_map([date], |row| {
                Ok(TopService {
                    service_name: row.get(0)?,
                    quantity: row.get(1)?,
                    revenue: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DailySummary {
            date: date.to_string(),
            transaction_count,
            total_sales,
            total_discounts,
            average_sale,
            by_payment_method,
            top_services,
        })
    })
}

/// Every line item sold that day, newest first, annotated with the
/// service's live category ("Uncategorized" when the service row is gone).
pub fn get_daily_jobs(db: &Database, date: &str) -> Result<Vec<DailyJob>> {
    db.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT bi.service_name, bi.quantity, bi.staff_name, b.created_at,
                    COALESCE(s.category, 'Uncategorized') as category
             FROM bill_items bi
             JOIN bills b ON bi.bill_id = b.id
             LEFT JOIN services s ON bi.service_id = s.id
             WHERE date(b.created_at) = date(?1)
             ORDER BY b.created_at DESC, bi.id DESC",
        )?;
        let jobs = stmt
            .query_map([date], |row| {
                Ok(DailyJob {
                    service_name: row.get(0)?,
                    quantity: row.get::<_, Option<i64>>(1)?.unwrap_or(1),
                    staff_name: row.get(2)?,
                    created_at: row.get(3)?,
                    category: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(jobs)
    })
}

/// Per-staff daily performance: three independently grouped result sets
/// (sales, per-payment-method subtotals, clocked time) joined in memory by
/// staff id. Every staff member appears, inactive ones included, with
/// zeroed/null fields when idle that day.
///
/// A still-open clock log contributes no minutes unless
/// `use_now_for_open_logs` is set, in which case its duration extends to
/// the current instant. Only meaningful when `date` is today.
pub fn get_staff_daily_report(
    db: &Database,
    date: &str,
    use_now_for_open_logs: bool,
) -> Result<Vec<StaffDailyRow>> {
    db.read(|conn| {
        let mut stmt = conn.prepare("SELECT id, name, active, role FROM staff ORDER BY name")?;
        let staff = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, Option<String>>(3)?
                        .unwrap_or_else(|| "staff".to_string()),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut sales: HashMap<i64, (i64, f64)> = HashMap::new();
        let mut stmt = conn.prepare(
            "SELECT bi.staff_id, SUM(bi.quantity) as jobs_count, SUM(bi.price * bi.quantity) as total_sales
             FROM bill_items bi
             JOIN bills b ON bi.bill_id = b.id
             WHERE date(b.created_at) = date(?1) AND bi.staff_id IS NOT NULL
             GROUP BY bi.staff_id",
        )?;
        let rows = stmt.query_map([date], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;
        for row in rows {
            let (staff_id, jobs_count, total_sales) = row?;
            sales.insert(staff_id, (jobs_count, total_sales));
        }

        let mut payments: HashMap<i64, Vec<StaffPayment>> = HashMap::new();
        let mut stmt = conn.prepare(
            "SELECT bi.staff_id, b.payment_method,
                    SUM(bi.price * bi.quantity) as total,
                    SUM(bi.quantity) as jobs_count
             FROM bill_items bi
             JOIN bills b ON bi.bill_id = b.id
             WHERE date(b.created_at) = date(?1) AND bi.staff_id IS NOT NULL
             GROUP BY bi.staff_id, b.payment_method
             ORDER BY b.payment_method",
        )?;
        let rows = stmt.query_map([date], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                StaffPayment {
                    method: row.get(1)?,
                    total: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    jobs_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                },
            ))
        })?;
        for row in rows {
            let (staff_id, payment) = row?;
            payments.entry(staff_id).or_default().push(payment);
        }

        // julianday(NULL) is NULL, so with the flag off an open log drops
        // out of the SUM instead of contributing a bogus duration.
        let mut times: HashMap<i64, (Option<String>, Option<String>, f64)> = HashMap::new();
        let mut stmt = conn.prepare(
            "SELECT staff_id,
                    MIN(clock_in) as first_clock_in,
                    MAX(clock_out) as last_clock_out,
                    SUM((julianday(
                        CASE WHEN clock_out IS NULL AND ?1 THEN datetime('now', 'localtime')
                             ELSE clock_out
                        END
                    ) - julianday(clock_in)) * 24 * 60) as total_minutes
             FROM staff_time_logs
             WHERE date(clock_in) = date(?2)
             GROUP BY staff_id",
        )?;
        let rows = stmt.query_map(params![use_now_for_open_logs, date], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
            ))
        })?;
        for row in rows {
            let (staff_id, first_clock_in, last_clock_out, total_minutes) = row?;
            times.insert(staff_id, (first_clock_in, last_clock_out, total_minutes));
        }

        let report = staff
            .into_iter()
            .map(|(staff_id, staff_name, active, role)| {
                let (jobs_count, total_sales) = sales.get(&staff_id).copied().unwrap_or((0, 0.0));
                let (first_clock_in, last_clock_out, total_minutes) =
                    times.get(&staff_id).cloned().unwrap_or((None, None, 0.0));

                StaffDailyRow {
                    staff_id,
                    staff_name,
                    active,
                    role,
                    jobs_count,
                    total_sales,
                    payments: payments.remove(&staff_id).unwrap_or_default(),
                    first_clock_in,
                    last_clock_out,
                    total_minutes,
                }
            })
            .collect();

        Ok(report)
    })
}

/// Quote a CSV field when it contains a comma, a double quote, or a
/// newline, doubling embedded quotes.
pub(crate) fn csv_escape(value: &str) -> String {
    if value.contains('"') || value.contains(',') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the staff daily report and the day's reservations as one CSV
/// document with two labeled sections separated by a blank line.
pub fn render_staff_csv(db: &Database, date: &str) -> Result<String> {
    let staff_report = get_staff_daily_report(db, date, false)?;
    let reservations = get_reservations_by_date(db, date)?;

    let mut lines =
        vec!["Section,Staff,Clock In,Clock Out,Total Minutes,Jobs,Total Sales,Payments".to_string()];
    for row in &staff_report {
        let payments = row
            .payments
            .iter()
            .map(|p| format!("{}:{}", p.method, p.total))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(
            [
                "STAFF_SUMMARY".to_string(),
                csv_escape(&row.staff_name),
                row.first_clock_in.clone().unwrap_or_default(),
                row.last_clock_out.clone().unwrap_or_default(),
                row.total_minutes.to_string(),
                row.jobs_count.to_string(),
                row.total_sales.to_string(),
                csv_escape(&payments),
            ]
            .join(","),
        );
    }

    lines.push(String::new());
    lines.push("Section,Start Time,End Time,Staff,Customer,Phone,Service,Status,Notes".to_string());
    for res in &reservations {
        lines.push(
            [
                "RESERVATION".to_string(),
                res.start_time.clone(),
                res.end_time.clone().unwrap_or_default(),
                csv_escape(res.staff_name.as_deref().unwrap_or("")),
                csv_escape(res.customer_name.as_deref().unwrap_or("")),
                csv_escape(res.customer_phone.as_deref().unwrap_or("")),
                csv_escape(res.service_name.as_deref().unwrap_or("")),
                csv_escape(&res.status),
                csv_escape(res.notes.as_deref().unwrap_or("")),
            ]
            .join(","),
        );
    }

    Ok(lines.join("\n"))
}

pub fn export_staff_csv(db: &Database, date: &str, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let csv = render_staff_csv(db, date)?;
    std::fs::write(path, csv)?;
    Ok(path.to_path_buf())
}
