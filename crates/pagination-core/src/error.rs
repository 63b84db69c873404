/// Result type alias for pagination operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pagination operations.
///
/// Malformed request input is never an error: the normalizer resolves it to
/// defaults. What remains are API misuse, query-engine anomalies and backend
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Last-page arithmetic was requested with a per-page size of zero.
   #[error("results per page was not set")]
   PerPageNotSet,

   /// The parameter object could not be built for a reason unrelated to the
   /// individual request values. The original cause is not retained.
   #[error("failed to map pagination parameters")]
   ParameterMapping,

   /// A single-scalar query returned no row.
   #[error("query returned no result, expected exactly one row")]
   NoResult,

   /// A single-scalar query returned more than one row.
   #[error("query returned {0} rows, expected exactly one row")]
   NonUniqueResult(usize),

   /// Failure reported by the query backend.
   #[error(transparent)]
   Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
   /// Wrap a backend failure.
   pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
      Error::Backend(Box::new(error))
   }

   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::PerPageNotSet => "PER_PAGE_NOT_SET".to_string(),
         Error::ParameterMapping => "PARAMETER_MAPPING_FAILED".to_string(),
         Error::NoResult => "NO_RESULT".to_string(),
         Error::NonUniqueResult(_) => "NON_UNIQUE_RESULT".to_string(),
         Error::Backend(_) => "BACKEND_ERROR".to_string(),
      }
   }

   /// HTTP-equivalent status for errors meant to cross the component
   /// boundary. Only the generic mapping failure carries one.
   pub fn status_code(&self) -> Option<u16> {
      match self {
         Error::ParameterMapping => Some(500),
         _ => None,
      }
   }

   /// Whether this is a count anomaly that callers resolve to a zero count.
   pub fn is_scalar_anomaly(&self) -> bool {
      matches!(self, Error::NoResult | Error::NonUniqueResult(_))
   }
}
