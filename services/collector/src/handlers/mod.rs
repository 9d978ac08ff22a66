//! HTTP handlers for the collector service.

pub mod collect;
pub mod health;
