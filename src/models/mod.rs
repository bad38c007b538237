//! Database models and DTOs for all domain entities.

pub mod customer;
pub mod lead;
pub mod pagination;
pub mod user;
