//! Salon point-of-sale backend: an embedded SQLite store with an explicit
//! open/checkpoint/close lifecycle, typed per-entity repositories, a
//! read-only reporting layer, and a name-dispatched request/response
//! bridge returning `{success, data|error}` envelopes.

pub mod bridge;
pub mod commands;
pub mod db;
pub mod error;
pub mod models;


pub use bridge::{dispatch, Envelope};
pub use db::Database;
pub use error::{Error, Result};
