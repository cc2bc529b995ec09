pub mod blob_store;
pub mod correction_log;
