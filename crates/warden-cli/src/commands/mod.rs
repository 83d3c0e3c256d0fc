//! Command implementations.

pub mod config;
pub mod entries;
pub mod history;
pub mod import;

pub use self::config::execute_config;
pub use self::entries::execute_entries;
pub use self::history::execute_history;
pub use self::import::{execute_import, run_import};
