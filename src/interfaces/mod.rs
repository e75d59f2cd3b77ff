pub mod cache_store;
pub mod compute_service;
pub mod node_inventory;
