use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// The blob store has nothing under this key.
    #[error("no blob stored under key '{key}'")]
    NotFound { key: String },

    #[error("no photo with id '{id}'")]
    UnknownPhoto { id: String },

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("comment is {len} characters long (max {max})")]
    CommentTooLong { len: usize, max: usize },

    #[error("no free photo id after {attempts} attempts")]
    AllocationExhausted { attempts: usize },

    #[error("storage backend error: {0}")]
    Backend(#[source] BoxError),

    #[error("id lookup failed: {0}")]
    Lookup(#[source] BoxError),
}

impl Error {
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }

    pub fn lookup(err: impl Into<BoxError>) -> Self {
        Self::Lookup(err.into())
    }

    /// True for both a missing blob and a missing photo record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownPhoto { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
