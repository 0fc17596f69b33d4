pub mod analytics;
pub mod api;
pub mod coins;
pub mod colors;
pub mod compression;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod models;
pub mod processing;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod timeframe;
