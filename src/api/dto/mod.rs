//! Data Transfer Objects for REST request/response serialization.

pub mod registry_dto;

pub use registry_dto::*;
