mod types;
mod client;
mod demo;
mod error;
mod store;
mod time;

pub use types::*;
pub use demo::DemoStore;
pub use store::Backend;
pub use time::{format_date, format_short, parse_user_date};
