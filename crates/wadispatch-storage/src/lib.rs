//! wadispatch Storage - access to the hosted backend
//!
//! All durable state lives in a hosted relational backend with row-level
//! security. This crate provides the record models, the [`Backend`]
//! collaborator abstraction with REST and in-memory implementations, and
//! one repository per resource kind.

pub mod backend;
pub mod memory;
pub mod models;
pub mod repository;
pub mod rest;

pub use backend::{Backend, Filter, Order, Query, RemoteProcedure, ResourceKind};
pub use memory::MemoryBackend;
pub use models::*;
pub use repository::*;
pub use rest::RestBackend;
