//! Logging helpers and progress bars

pub mod log;
pub mod progress;

pub use self::log::{log_empty_input, log_read_complete, log_read_start};
pub use progress::{create_main_progress_bar, finish_progress_bar, optional_progress_bar};
