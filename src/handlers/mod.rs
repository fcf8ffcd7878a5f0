// src/handlers/mod.rs

pub mod live;
pub mod monitor;
