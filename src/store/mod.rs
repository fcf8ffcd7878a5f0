// src/store/mod.rs

pub mod hub;
pub mod memory;
pub mod postgres;
