pub mod graph;

pub use graph::{Cycle, DependencyGraph, Resolution};
