use std::fmt;
use std::time::Duration;

/// Pipeline stage whose failure aborted a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticate,
    Search,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Authenticate => f.write_str("authentication"),
            Stage::Search => f.write_str("search"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingsError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No listings found for category {category_id}")]
    NoResults { category_id: String },

    #[error(
        "Rate limited while searching category {category_id}; try again in {} seconds",
        cool_down.as_secs()
    )]
    RateLimited {
        category_id: String,
        cool_down: Duration,
    },

    #[error("Upstream error for category {category_id} (HTTP {status}): {message}")]
    Upstream {
        category_id: String,
        status: u16,
        message: String,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Category {category_id}: {stage} failed: {source}")]
    Failed {
        category_id: String,
        stage: Stage,
        #[source]
        source: Box<ListingsError>,
    },
}

impl ListingsError {
    /// The originating error, looking through any [`ListingsError::Failed`] wrapper.
    pub fn root(&self) -> &ListingsError {
        match self {
            ListingsError::Failed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stage that produced a run-level failure, if this error was wrapped by the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ListingsError::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.root(), ListingsError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, ListingsError>;
