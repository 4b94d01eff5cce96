use thiserror::Error;

pub mod env;
pub mod metrics;
pub mod types;
pub mod utils;
pub mod weather;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("upstream responded with status {0}")]
    Upstream(u16),
}
