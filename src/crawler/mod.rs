pub mod collector;
pub mod controller;
pub mod retry;
pub mod scheduler;
pub mod task;

// Re-export common types
pub use controller::ProductScraper;
