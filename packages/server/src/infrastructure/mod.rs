//! Infrastructure layer: registry storage, credential verification and DTOs.

pub mod auth;
pub mod dto;
pub mod repository;
