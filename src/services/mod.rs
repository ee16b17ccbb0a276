//! Services separating I/O and format concerns from the pipeline logic

pub mod format;
pub mod ingest;

pub use format::MatteFormat;
pub use ingest::ImageIngestor;
