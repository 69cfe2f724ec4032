// CV Document Normalization & Synchronization Engine.
// Pure and synchronous: no IO, no clocks. Session plumbing lives in `session`.

pub mod assembler;
pub mod bullets;
pub mod fields;
pub mod languages;
pub mod mirror;
pub mod models;
pub mod mutation;
pub mod render;
pub mod sections;

pub use assembler::assemble;
pub use models::{Document, SectionType};
