pub mod commands;

pub use commands::{parse_analyze_args, render_status, run_cli, usage};
