//! Per-document vocabulary counts over a corpus split into byte ranges, one
//! range per worker, with the partial tables summed at the end.

pub mod boundary;
pub mod config;
pub mod corpus;
pub mod counter;
pub mod error;
pub mod logging;
pub mod parallel;
pub mod run;
pub mod store;
pub mod table;
pub mod termdocmat;
pub mod types;
pub mod vocab;

pub use error::{Result, TokfreakError};
