// src/lib.rs

//! Rhymer: rhyme corpus crawler and query engine

pub mod error;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;
