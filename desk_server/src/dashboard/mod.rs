//! Dashboard aggregation.

pub mod kpi;
