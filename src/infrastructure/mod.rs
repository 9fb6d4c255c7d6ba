// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod discord;
pub mod garmin;
