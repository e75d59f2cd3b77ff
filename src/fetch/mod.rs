pub mod http;
pub mod pagination;
