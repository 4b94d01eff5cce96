//! Saved locations: domain types, payload sanitization, the file-backed
//! store and the repository trait the HTTP layer depends on.

pub mod domain;
pub mod input;
pub mod repository;
pub mod store;

pub use domain::{Location, LocationField, LocationPatch, NewLocation};
pub use repository::LocationRepository;
pub use store::LocationStore;
