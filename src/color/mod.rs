/// Packed colors, color distance and representative color extraction
pub mod metric;

pub use metric::Color;
