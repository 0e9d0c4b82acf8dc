//! Request handlers for the admin API.

mod collections;
mod records;
mod uploads;

pub use collections::*;
pub use records::*;
pub use uploads::*;
