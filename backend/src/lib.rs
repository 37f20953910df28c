pub mod classify;
pub mod config;
pub mod inference;
pub mod routes;
pub mod storage;
