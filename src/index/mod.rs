/// Concurrent directory indexing pipeline
pub mod builder;
/// Color to tile-image mapping with nearest-color queries and serialization
pub mod color_index;
/// Nearest-neighbor strategies over distinct colors
pub mod search;

pub use builder::{BuildPhase, BuildSummary, IndexBuilder, IndexedImage};
pub use color_index::ColorIndex;
pub use search::{ColorSearch, KdTreeSearch, LinearSearch, SearchStrategy};
