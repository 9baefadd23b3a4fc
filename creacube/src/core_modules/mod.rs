pub mod adjacency;
pub mod catalog;
pub mod cube;
pub mod debouncer;
pub mod frame;
pub mod geometry;
