pub mod backup;
pub mod order;

pub use backup::{backup_to_path, database_config, execute_backup, open_sink, BackupResult};
pub use order::{execute_order, plan_order, write_graph, OrderResult, SkippedTable};

#[cfg(feature = "cli")]
pub use backup::print_backup_summary;
#[cfg(feature = "cli")]
pub use order::print_order_summary;
