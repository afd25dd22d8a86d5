//! Request/response bridge: every domain operation invoked by name with
//! positional arguments, answered with a `{success, data|error}` envelope.
//! UI code everywhere branches on `success`, so this shape is load-bearing.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::commands::{
    bills, categories, customers, reports, reservations, services, settings, staff,
};
use crate::db::Database;
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Envelope {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Envelope {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Envelope {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn respond<T: Serialize>(result: Result<T>) -> Envelope {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(data) => Envelope::ok(data),
            Err(err) => Envelope::err(err.to_string()),
        },
        Err(err) => Envelope::err(err.to_string()),
    }
}

fn respond_empty(result: Result<()>) -> Envelope {
    match result {
        Ok(()) => Envelope::ok_empty(),
        Err(err) => Envelope::err(err.to_string()),
    }
}

fn parse<T: DeserializeOwned>(value: Value, index: usize) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|err| Error::validation(format!("invalid argument {index}: {err}")))
}

fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T> {
    parse(args.get(index).cloned().unwrap_or(Value::Null), index)
}

/// Missing or null positional arguments fall back to `default`.
fn arg_or<T: DeserializeOwned>(args: &[Value], index: usize, default: T) -> Result<T> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => parse(value.clone(), index),
    }
}

/// Invoke a domain operation by its wire name. Unknown methods and
/// malformed arguments come back as error envelopes, never as panics.
pub fn dispatch(db: &Database, method: &str, args: &[Value]) -> Envelope {
    match method {
        // Services
        "services:getAll" => respond(
            arg_or(args, 0, true).and_then(|active_only| services::get_services(db, active_only)),
        ),
        "services:getByCategory" => respond(
            arg::<String>(args, 0)
                .and_then(|category| services::get_services_by_category(db, &category)),
        ),
        "services:get" => respond(arg(args, 0).and_then(|id| services::get_service(db, id))),
        "services:create" => {
            respond(arg(args, 0).and_then(|data| services::create_service(db, data)))
        }
        "services:update" => respond((|| {
            let id = arg(args, 0)?;
            let data = arg(args, 1)?;
            services::update_service(db, id, data)
        })()),
        "services:delete" => {
            respond_empty(arg(args, 0).and_then(|id| services::delete_service(db, id)))
        }

        // Categories
        "categories:getAll" => respond(
            arg_or(args, 0, true)
                .and_then(|active_only| categories::get_categories(db, active_only)),
        ),
        "categories:create" => {
            respond(arg(args, 0).and_then(|data| categories::create_category(db, data)))
        }
        "categories:delete" => {
            respond_empty(arg(args, 0).and_then(|id| categories::delete_category(db, id)))
        }

        // Customers
        "customers:getAll" => respond(customers::get_customers(db)),
        "customers:search" => respond(
            arg::<String>(args, 0).and_then(|query| customers::search_customers(db, &query)),
        ),
        "customers:get" => respond(arg(args, 0).and_then(|id| customers::get_customer(db, id))),
        "customers:create" => {
            respond(arg(args, 0).and_then(|data| customers::create_customer(db, data)))
        }
        "customers:update" => respond((|| {
            let id = arg(args, 0)?;
            let data = arg(args, 1)?;
            customers::update_customer(db, id, data)
        })()),
        "customers:delete" => {
            respond_empty(arg(args, 0).and_then(|id| customers::delete_customer(db, id)))
        }

        // Staff
        "staff:getAll" => respond(
            arg_or(args, 0, true).and_then(|active_only| staff::get_staff(db, active_only)),
        ),
        "staff:get" => respond(arg(args, 0).and_then(|id| staff::get_staff_member(db, id))),
        "staff:create" => respond(arg(args, 0).and_then(|data| staff::create_staff(db, data))),
        "staff:update" => respond((|| {
            let id = arg(args, 0)?;
            let data = arg(args, 1)?;
            staff::update_staff(db, id, data)
        })()),
        "staff:clockStatus" => respond((|| {
            let staff_id = arg(args, 0)?;
            let date: String = arg(args, 1)?;
            staff::get_staff_clock_status(db, staff_id, &date)
        })()),
        "staff:clockIn" => {
            respond(arg(args, 0).and_then(|staff_id| staff::clock_in_staff(db, staff_id)))
        }
        "staff:clockOut" => {
            respond(arg(args, 0).and_then(|log_id| staff::clock_out_staff(db, log_id)))
        }

        // Bills
        "bills:create" => respond(arg(args, 0).and_then(|data| bills::create_bill(db, data))),
        "bills:get" => respond(arg(args, 0).and_then(|id| bills::get_bill(db, id))),
        "bills:getAll" => respond(
            arg_or(args, 0, Default::default()).and_then(|query| bills::get_bills(db, query)),
        ),

        // Reservations
        "reservations:create" => {
            respond(arg(args, 0).and_then(|data| reservations::create_reservation(db, data)))
        }
        "reservations:update" => respond((|| {
            let id = arg(args, 0)?;
            let data = arg(args, 1)?;
            reservations::update_reservation(db, id, data)
        })()),

        // Reports
        "reports:daily" => respond(
            arg::<String>(args, 0).and_then(|date| reports::get_daily_summary(db, &date)),
        ),
        "reports:dailyJobs" => respond(
            arg::<String>(args, 0).and_then(|date| reports::get_daily_jobs(db, &date)),
        ),
        "reports:staffDaily" => respond((|| {
            let date: String = arg(args, 0)?;
            let use_now_for_open_logs = arg_or(args, 1, false)?;
            reports::get_staff_daily_report(db, &date, use_now_for_open_logs)
        })()),
        "reports:reservationsByDate" => respond(
            arg::<String>(args, 0)
                .and_then(|date| reservations::get_reservations_by_date(db, &date)),
        ),
        "reports:exportStaffCsv" => respond((|| {
            let date: String = arg(args, 0)?;
            let path: String = arg(args, 1)?;
            let written = reports::export_staff_csv(db, &date, &path)?;
            Ok(json!({ "path": written }))
        })()),

        // Settings
        "settings:get" => respond(
            arg::<String>(args, 0).and_then(|key| settings::get_setting(db, &key)),
        ),
        "settings:set" => respond_empty((|| {
            let key: String = arg(args, 0)?;
            let value: String = arg(args, 1)?;
            settings::set_setting(db, &key, &value)
        })()),
        "settings:getAll" => respond(settings::get_settings(db)),

        // Admin
        "admin:verifyPin" => respond((|| {
            let pin: String = arg(args, 0)?;
            let valid = settings::verify_admin_pin(db, &pin)?;
            Ok(json!({ "valid": valid }))
        })()),

        // Database lifecycle
        "database:backup" => respond((|| {
            let path: String = arg(args, 0)?;
            db.backup(&path)?;
            Ok(json!({ "path": path }))
        })()),
        "database:restore" => respond_empty(
            arg::<String>(args, 0).and_then(|path| db.restore(&path)),
        ),

        _ => Envelope::err(format!("unknown method: {method}")),
    }
}
