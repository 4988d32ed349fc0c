pub mod context;
pub mod engine;
pub mod redis_storage;
pub mod run;
pub mod storage;
