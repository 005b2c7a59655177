// src/services/mod.rs
pub mod aggregation;
pub mod backend;
pub mod cache;
pub mod dashboard;
pub mod google_oauth;
pub mod loader;
pub mod locale;
pub mod memory;
pub mod session;
pub mod sheets;
pub mod tariff;
