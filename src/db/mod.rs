pub mod accounts;
pub mod alert_repo;
pub mod models;
pub mod snapshot_store;

pub use accounts::SqliteAccountSource;
pub use alert_repo::SqliteAlertRepository;
pub use snapshot_store::SqliteSnapshotStore;
