//! Application Layer
//!
//! Contains business logic services, the reference resolver they share and
//! data transfer objects (DTOs). This layer orchestrates the flow of data
//! between the presentation and domain layers.

pub mod dto;
pub mod resolver;
pub mod services;
