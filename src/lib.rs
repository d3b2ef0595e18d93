pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod crypto;
pub mod errors;
pub mod kms;
pub mod record;
pub mod storage;
pub mod store;
pub mod version;
