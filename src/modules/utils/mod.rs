pub mod logging;
pub mod time;

pub use logging::{initialize_logging, log_auth_event};
pub use time::{current_timestamp, format_timestamp};
