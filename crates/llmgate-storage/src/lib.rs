//! SeaORM-backed credential storage.

pub mod entities;
mod seaorm;
mod storage;

pub use seaorm::{SeaOrmCredentialStore, UserKeyRow};
pub use storage::{StorageError, StorageResult};
