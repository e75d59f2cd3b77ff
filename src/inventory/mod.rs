pub mod kubernetes;
pub mod quantity;
