//! Business logic services.

pub mod auth;
pub mod customer;
pub mod dashboard;
pub mod lead;
pub mod user;
