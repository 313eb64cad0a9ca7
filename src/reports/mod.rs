pub mod exit_summary;

pub use exit_summary::{exit_summary_file_name, render_exit_summary};
