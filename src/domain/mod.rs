// Domain layer - Dates, metric identifiers and derived metric models
pub mod metric_id;
pub mod metrics;
pub mod period;
pub mod summary;
