// src/handlers/mod.rs

pub mod comment;
