// src/extractors/mod.rs
pub mod cleaning;
pub mod patterns;
pub mod section;

// Re-export key extraction types for convenience
pub use patterns::{Occurrence, PatternTable, SectionKind};
pub use section::{BodyPolicy, ProcessedDocument, SectionExtractor};
