pub mod api;
pub mod app;
pub mod config;
pub mod shared;
pub mod workflow;
