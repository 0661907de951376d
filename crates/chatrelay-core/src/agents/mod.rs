//! Agent protocol handling: event model, parsing, correlation, aggregation.

pub mod aggregate;
pub mod claude;
pub mod correlator;
pub mod event;
