//! Secret wrappers and the cached service token model.

pub mod secret;
pub mod service;
