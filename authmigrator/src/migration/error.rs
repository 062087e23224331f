/// Errors raised while creating a migrator.
///
/// These are configuration errors: they surface when a migrator is requested and never from
/// `migrate`, which reports every failure through [`crate::MigrationResult`].
#[crate::error::auth_error]
pub enum MigratorError {
    /// The app's database URL could not be parsed
    #[error("invalid database URL: {url}")]
    InvalidDatabaseUrl {
        /// The configured URL
        url: String,
    },

    /// The app's database URL has no host to derive the authority from
    #[error("database URL has no authority host: {url}")]
    MissingAuthorityHost {
        /// The configured URL
        url: String,
    },

    /// The derived exchange endpoint is not a valid URL
    #[error("invalid exchange endpoint: {endpoint}")]
    InvalidExchangeEndpoint {
        /// The endpoint that failed to parse
        endpoint: String,
    },

    /// `get_default_instance` was called before a default app was designated
    #[error("default app not set. Call set_default_app() first.")]
    DefaultAppNotInitialized,
}
