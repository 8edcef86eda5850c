// Presentation layer - The sink the computed panels are handed to
pub mod sink;
