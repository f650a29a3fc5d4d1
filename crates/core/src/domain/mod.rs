pub mod product;
pub mod segment;
