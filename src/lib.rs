pub mod app;
pub mod config;
pub mod engine;
pub mod execution;
pub mod guard;
pub mod history;
pub mod patterns;
pub mod session;
pub mod shared;
