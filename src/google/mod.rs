//! Google REST clients authenticated with a service account.

pub mod auth;
pub mod calendar;
pub mod sheets;

pub use self::auth::{ServiceAccountAuth, ServiceAccountKey};
pub use self::calendar::CalendarClient;
pub use self::sheets::SheetsClient;
