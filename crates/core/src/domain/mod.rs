pub mod action;
pub mod context;
pub mod intent;
pub mod product;
pub mod resolution;
