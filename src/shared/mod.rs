pub mod fs_atomic;
pub mod logging;
pub mod paths;
pub mod time;

pub use fs_atomic::atomic_write_file;
pub use logging::append_client_log;
pub use paths::ClientPaths;
pub use time::{now_rfc3339, now_secs};
