// src/lib.rs

//! Catalog watch library

pub mod clock;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
