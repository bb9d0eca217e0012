// Library crate for foldersync
// Re-exports modules for use in integration tests and the binary

pub mod logger;
pub mod sync;
