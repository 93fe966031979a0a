/// Database model definitions.
pub mod models;
/// Session snapshot storage and retrieval operations.
pub mod session_store;
/// Storage abstraction layer for persistence operations.
pub mod storage;
