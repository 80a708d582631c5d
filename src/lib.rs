pub mod browser;
pub mod config;
pub mod fetcher;
pub mod pdf;
