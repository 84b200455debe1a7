// src/lib.rs

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod tree;
pub mod usecase;
pub mod utils;

pub use routes::create_router;
