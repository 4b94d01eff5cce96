//! Storage primitives for the service layer
//!
//! Small collections are persisted as whole JSON documents, rewritten
//! atomically on every change.

pub mod atomic_file;
