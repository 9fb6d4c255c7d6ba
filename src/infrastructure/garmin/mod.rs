// Garmin Connect adapter
pub mod client;
pub mod dtos;
pub mod endpoints;
pub mod mapper;
pub mod registrations;
pub mod session;
