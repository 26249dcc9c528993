pub mod config;
pub mod error;
pub mod interval;
pub mod list_identity;
pub mod model;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod task_store;
