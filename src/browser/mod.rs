pub mod behavior;
pub mod engine;
pub mod fingerprint;
pub mod session;
pub mod snapshot;
pub mod webdriver;

#[cfg(test)]
pub mod testing;

// Re-export common types
pub use behavior::RandomPacing;
pub use fingerprint::IdentityPool;
pub use snapshot::SnapshotDocument;
pub use webdriver::WebDriverEngine;
