// src/handlers.rs

pub mod auth;
pub mod cases;
pub mod companies;
pub mod validations;
