//! Service layer: the saved-location store, its on-disk persistence and the
//! rate limiter guarding HTTP endpoints.
//! - Keeps storage and admission control independent of the HTTP framework.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod locations;
pub mod rate_limiter;
pub mod runtime;
pub mod storage;
