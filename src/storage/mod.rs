pub mod export;
pub mod identifiers;

// Re-export common types
pub use export::sinks;
pub use identifiers::IdentifierSource;
