//! Configuration for the SQLite connection pool

use std::time::Duration;

/// Configuration for the pool behind a [`SqliteQuerySource`](crate::SqliteQuerySource)
///
/// # Examples
///
/// ```
/// use paginated_repository::SqliteSourceConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = SqliteSourceConfig::default();
///
/// // Override just one field
/// let config = SqliteSourceConfig {
///    max_connections: 2,
///    ..Default::default()
/// };
/// assert_eq!(config.idle_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct SqliteSourceConfig {
   /// Maximum number of pooled connections
   ///
   /// A page request uses one connection at a time, so this bounds how many
   /// requests query the database concurrently.
   ///
   /// Default: 6
   pub max_connections: u32,

   /// Idle timeout for pooled connections
   ///
   /// Default: 30 seconds
   pub idle_timeout: Duration,
}

impl Default for SqliteSourceConfig {
   fn default() -> Self {
      Self {
         max_connections: 6,
         idle_timeout: Duration::from_secs(30),
      }
   }
}
