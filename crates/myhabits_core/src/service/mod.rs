//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into habit use-case APIs.
//! - Keep UI layers decoupled from storage details.

pub mod habit_service;
