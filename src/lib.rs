pub mod auth;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod fetch;
pub mod interfaces;
pub mod inventory;
pub mod observability;
pub mod providers;
pub mod refresh;
pub mod types;
pub mod utils;
