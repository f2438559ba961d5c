pub mod auth;
pub mod case;
pub mod company;
pub mod crew;
pub mod token;
pub mod validation;
