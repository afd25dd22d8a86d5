use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub show_on_home: bool,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub show_on_home: Option<bool>,
    pub active: Option<bool>,
}

/// Partial patch: unset fields keep their previous value.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateService {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub show_on_home: Option<bool>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub display_order: i64,
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub display_order: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub loyalty_points: i64,
    pub visits: i64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// Staff read model. The PIN column is deliberately absent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub commission_rate: f64,
    pub active: bool,
    pub role: String,
    pub photo_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateStaff {
    pub name: String,
    pub commission_rate: Option<f64>,
    pub role: Option<String>,
    pub pin: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateStaff {
    pub name: Option<String>,
    pub commission_rate: Option<f64>,
    pub active: Option<bool>,
    pub role: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeLog {
    pub id: i64,
    pub staff_id: i64,
    pub clock_in: String,
    pub clock_out: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClockStatus {
    pub open_log: Option<TimeLog>,
    pub first_clock_in: Option<String>,
    pub last_clock_out: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bill {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub discount_type: Option<String>,
    pub total: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub notes: Option<String>,
    pub created_at: String,
}

/// One sold service within a bill. `service_name`, `price` and `staff_name`
/// are captured at sale time so later catalog or staff edits never alter
/// past bills.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BillItem {
    pub id: i64,
    pub bill_id: i64,
    pub service_id: i64,
    pub service_name: String,
    pub price: f64,
    pub quantity: i64,
    pub staff_id: Option<i64>,
    pub staff_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBillItem {
    pub service_id: i64,
    pub price: f64,
    pub quantity: Option<i64>,
    pub staff_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBill {
    pub customer_id: Option<i64>,
    pub discount_amount: Option<f64>,
    pub discount_type: Option<String>,
    pub payment_method: String,
    pub notes: Option<String>,
    pub items: Vec<CreateBillItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BillWithItems {
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BillQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Reservation {
    pub id: i64,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub staff_id: Option<i64>,
    pub staff_name: Option<String>,
    pub service_name: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateReservation {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub staff_id: Option<i64>,
    pub service_name: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateReservation {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub staff_id: Option<i64>,
    pub service_name: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    pub payment_method: String,
    pub count: i64,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopService {
    pub service_name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: String,
    pub transaction_count: i64,
    pub total_sales: f64,
    pub total_discounts: f64,
    pub average_sale: f64,
    pub by_payment_method: Vec<PaymentMethodSummary>,
    pub top_services: Vec<TopService>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyJob {
    pub service_name: String,
    pub quantity: i64,
    pub staff_name: Option<String>,
    pub created_at: String,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StaffPayment {
    pub method: String,
    pub total: f64,
    pub jobs_count: i64,
}

/// One row of the staff daily report. Staff with no activity on the day
/// still appear with zeroed/null fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffDailyRow {
    pub staff_id: i64,
    pub staff_name: String,
    pub active: bool,
    pub role: String,
    pub jobs_count: i64,
    pub total_sales: f64,
    pub payments: Vec<StaffPayment>,
    pub first_clock_in: Option<String>,
    pub last_clock_out: Option<String>,
    pub total_minutes: f64,
}
