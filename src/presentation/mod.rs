// Presentation layer - View models, message rendering and notification handlers
pub mod message;
pub mod metric_views;
pub mod notifier;
pub mod view_models;
