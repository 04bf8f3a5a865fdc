use std::sync::Arc;

/// Outcome of asking an upstream source about one target.
#[derive(Debug, Clone)]
pub enum ProviderResult<T> {
    /// The operation succeeded and data was found.
    Found(T),

    /// The source cannot resolve the target to anything it knows about.
    NotFound,

    /// An error occurred while talking to the source.
    Error(Arc<ohno::AppError>),
}

impl<T> ProviderResult<T> {
    /// Returns `true` if the result is `Found`.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns `true` if the result is `Error`.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns a reference to the contained data if `Found`, otherwise `None`.
    #[must_use]
    pub const fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Found(data) => Some(data),
            _ => None,
        }
    }

    /// Transform the found value, keeping the other variants.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProviderResult<U> {
        match self {
            Self::Found(data) => ProviderResult::Found(f(data)),
            Self::NotFound => ProviderResult::NotFound,
            Self::Error(e) => ProviderResult::Error(e),
        }
    }
}

impl<T> From<crate::Result<T>> for ProviderResult<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => Self::Found(data),
            Err(e) => Self::Error(Arc::new(e)),
        }
    }
}
