// src/lib.rs

pub mod db;
pub mod repositories;
pub mod training;
pub mod auth;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use brandbot_common::error::Error;
pub use brandbot_common::models;
