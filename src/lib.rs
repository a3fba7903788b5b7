// src/lib.rs

pub mod api;
pub mod dashboard;
pub mod monitoring;
pub mod risk_detection;
pub mod service;
