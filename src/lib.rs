pub mod agent;
pub mod config;
pub mod context;
pub mod runner;
pub mod sanitize;
