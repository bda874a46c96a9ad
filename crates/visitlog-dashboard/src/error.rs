use thiserror::Error;

use visitlog_core::error::CoreError;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("visit store error: {0}")]
    Store(#[from] CoreError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("console i/o error: {0}")]
    Io(#[from] std::io::Error),
}
