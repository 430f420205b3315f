//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI callers decoupled from storage details.

pub mod app_context;
pub mod email_address_service;
pub mod seed;
