// src/lib.rs

//! Newswire: polls a news homepage and relays new articles to a chat webhook.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
