pub mod demo;
pub mod offline;
