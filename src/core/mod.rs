//! Core library components.
//!
//! This module contains the reusable logic for the store document, envelope
//! encryption, environment resolution and template rendering.

pub mod cipher;
pub mod client;
pub mod constants;
pub mod diff;
pub mod env;
pub mod store;
pub mod template;
pub mod types;
pub mod validation;
