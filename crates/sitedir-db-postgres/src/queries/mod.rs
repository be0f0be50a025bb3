//! SQL query implementations, one module per table.

pub mod profiles;
pub mod sites;
