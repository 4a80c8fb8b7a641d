pub mod db;

pub use db::{
    create_db, recent_transactions, replace_transactions, DbPool, StorageError, StoredTransaction,
    DEFAULT_TABLE,
};
