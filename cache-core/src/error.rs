use miette::Diagnostic;
use thiserror::Error;

/// A `Result` typedef to use with the [`CacheError`] type.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A generic error for the cache decision engine and its collaborators.
#[derive(Error, Diagnostic, Debug)]
pub enum CacheError {
    /// A general error used as a catch-all for lower-level errors we don't
    /// otherwise model, via anyhow.
    #[error(transparent)]
    #[diagnostic(code(cache_core::general))]
    General(#[from] anyhow::Error),

    /// There was an error converting a header to a string.
    #[error(transparent)]
    #[diagnostic(code(cache_core::header_to_str))]
    HeaderToStr(#[from] http::header::ToStrError),

    /// There was an error parsing an HTTP header value.
    #[error(transparent)]
    #[diagnostic(code(cache_core::invalid_header_value))]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// There was an error parsing an HTTP header name.
    #[error(transparent)]
    #[diagnostic(code(cache_core::invalid_header_name))]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// There was an error parsing the HTTP status code.
    #[error(transparent)]
    #[diagnostic(code(cache_core::invalid_status_code))]
    InvalidStatusCode(#[from] http::status::InvalidStatusCode),

    /// There was an error parsing the HTTP method.
    #[error(transparent)]
    #[diagnostic(code(cache_core::invalid_method))]
    InvalidMethod(#[from] http::method::InvalidMethod),

    /// There was an error parsing the request URI.
    #[error(transparent)]
    #[diagnostic(code(cache_core::invalid_uri))]
    InvalidUri(#[from] http::uri::InvalidUri),

    /// There was an error parsing a URL.
    #[error(transparent)]
    #[diagnostic(code(cache_core::invalid_url))]
    InvalidUrl(#[from] url::ParseError),

    /// A body resource exceeded `max_object_size` and was rejected by the
    /// configured [`crate::ResourceFactory`].
    #[error("body of {size} bytes exceeds the configured maximum of {max} bytes")]
    #[diagnostic(code(cache_core::body_too_large))]
    BodyTooLarge {
        /// Size of the rejected body, in bytes.
        size: u64,
        /// Configured ceiling, in bytes.
        max: u64,
    },

    /// The backend reported a transport-level failure (connection refused,
    /// timed out, reset, and so on).
    #[error("backend transport error: {0}")]
    #[diagnostic(code(cache_core::backend))]
    Backend(String),

    /// The call was cancelled before the backend produced a response.
    #[error("request was cancelled")]
    #[diagnostic(code(cache_core::cancelled))]
    Cancelled,

    /// A compare-and-set write lost the race more times than
    /// `CacheConfig::cas_retry_limit` allows.
    #[error("storage update for {0:?} lost the compare-and-set race too many times")]
    #[diagnostic(code(cache_core::cas_contention))]
    CasContention(crate::key::StorageKey),
}
