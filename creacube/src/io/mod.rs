//! File-facing collaborators of the annotation engine: decoding tracker exports,
//! loading the configuration catalog, and writing the event log.

pub mod catalog_store;
pub mod decoder;
pub mod event_writer;
