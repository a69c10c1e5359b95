//! Inlining engine
//!
//! Turns a statement and the record store into a self-contained document:
//! - Reference resolution with attributable errors
//! - Statement expansion (variant -> definingContext -> sequenceReference -> members)
//! - Batch driving over every statement in the store

pub mod resolver;
pub mod expander;
pub mod batch;

pub use resolver::{Resolver, ResolveStep};
pub use expander::{Expander, ExpandedStatement};
pub use batch::{BatchDriver, BatchOptions, BatchStats, ErrorPolicy, OutputFormat};
