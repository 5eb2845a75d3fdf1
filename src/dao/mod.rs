/// Persistence gateway used by the match controller.
pub mod match_store;
/// Persisted record definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
