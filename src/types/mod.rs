pub mod cache_key;
pub mod compute;
pub mod node;
