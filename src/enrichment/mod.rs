pub mod catalog;
pub mod label_mapper;
pub mod pipeline;
