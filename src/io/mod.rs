/// Cooperative cancellation shared by workers and producers
pub mod cancel;
/// Command-line interface and run orchestration
pub mod cli;
/// Constants and runtime options
pub mod configuration;
/// Recursive discovery of tile images
pub mod directory;
/// Error types and path context
pub mod error;
/// Image decoding, resizing and encoding
pub mod image;
/// Terminal progress display and status sinks
pub mod progress;
