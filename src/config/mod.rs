// src/config/mod.rs
pub mod site;

pub use site::SiteConfig;
