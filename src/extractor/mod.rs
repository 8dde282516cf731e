pub mod document;
pub mod product;
pub mod strategy;

// Re-export common types
pub use product::ProductExtractor;
