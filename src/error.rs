/// Result type alias for SQLite backend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the SQLite backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the pagination core.
   #[error(transparent)]
   Pagination(#[from] pagination_core::Error),

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// I/O error when preparing the database location.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// Database errors carry SQLite's own code, e.g. `SQLITE_1`.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Pagination(e) => e.error_code(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }
}

impl From<Error> for pagination_core::Error {
   fn from(error: Error) -> Self {
      match error {
         Error::Pagination(inner) => inner,
         other => pagination_core::Error::backend(other),
      }
   }
}
