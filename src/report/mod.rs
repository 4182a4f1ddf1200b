//! Report layer
//! - sink.rs: OutputSink trait and the console implementation
//! - render.rs: table, list and JSON renderers

pub mod render;
pub mod sink;

pub use render::{ReportFormat, render};
pub use sink::{ConsoleSink, OutputSink};
