// src/services.rs

pub mod auth;
pub mod company_service;
pub mod issuer;
pub mod scanner;
pub mod validator;
