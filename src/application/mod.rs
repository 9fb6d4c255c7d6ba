// Application layer - Use cases and the ports they depend on
pub mod health_gateway;
pub mod notification;
pub mod registry;
pub mod scheduler_service;
pub mod summary_service;
pub mod time_source;
