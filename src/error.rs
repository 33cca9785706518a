use std::path::PathBuf;
use thiserror::Error;

/// Main error type for schemadump
#[derive(Error, Debug)]
pub enum BackupError {
    // Database Connection Errors
    #[error("Failed to connect to database: {message}")]
    Connection {
        message: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    // Catalog Errors
    #[error("Catalog query '{operation}' failed{}: {message}", table_suffix(.table))]
    CatalogQuery {
        operation: String,
        table: Option<String>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Output Errors
    #[error("Failed to open output {path}: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write backup output: {source}")]
    SinkWrite {
        #[source]
        source: std::io::Error,
    },

    // Dependency Resolution Errors
    #[error("Circular foreign key dependency detected: {0}")]
    CycleDetected(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoad {
        path: PathBuf,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

fn table_suffix(table: &Option<String>) -> String {
    match table {
        Some(table) => format!(" for table {}", table),
        None => String::new(),
    }
}

impl BackupError {
    /// Build a catalog error for an operation, optionally scoped to a table
    pub fn catalog(
        operation: impl Into<String>,
        table: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        BackupError::CatalogQuery {
            operation: operation.into(),
            table: table.map(str::to_string),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a driver error raised while running a catalog query
    pub fn from_query(operation: &str, table: Option<&str>, err: tokio_postgres::Error) -> Self {
        BackupError::CatalogQuery {
            operation: operation.to_string(),
            table: table.map(str::to_string),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Whether this error ends the run before anything was written
    pub fn is_fatal_before_output(&self) -> bool {
        matches!(
            self,
            BackupError::Connection { .. }
                | BackupError::InvalidConnectionString(_)
                | BackupError::SinkOpen { .. }
                | BackupError::CycleDetected(_)
                | BackupError::Configuration(_)
                | BackupError::ConfigLoad { .. }
        )
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        BackupError::SinkWrite { source: err }
    }
}

impl From<tokio_postgres::Error> for BackupError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Check if it's a connection error by examining the error message
        if err.is_closed() || err.to_string().contains("connect") {
            BackupError::Connection {
                message: err.to_string(),
                source: err,
            }
        } else {
            BackupError::CatalogQuery {
                operation: "query".to_string(),
                table: None,
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}

impl From<Box<dyn std::error::Error>> for BackupError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        BackupError::Other(err.to_string())
    }
}

/// Result type alias for schemadump operations
pub type Result<T> = std::result::Result<T, BackupError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Attach the table and catalog operation that produced the error
    fn table_context(self, operation: &str, table: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<BackupError>,
{
    fn table_context(self, operation: &str, table_name: &str) -> Result<T> {
        self.map_err(|e| {
            let mut err = e.into();
            match &mut err {
                BackupError::CatalogQuery { operation: op, table, .. } => {
                    *op = operation.to_string();
                    if table.is_none() {
                        *table = Some(table_name.to_string());
                    }
                }
                BackupError::Other(msg) => {
                    *msg = format!("Error processing table '{}': {}", table_name, msg);
                }
                _ => {}
            }
            err
        })
    }
}

/// Helper function to format error with all its causes
pub fn format_error_chain(err: &BackupError) -> String {
    use std::error::Error;

    let mut output = format!("Error: {}", err);

    let mut current_err: &dyn Error = err;
    while let Some(source) = current_err.source() {
        output.push_str(&format!("\n  Caused by: {}", source));
        current_err = source;
    }

    output
}

/// Helper function to suggest fixes for common errors
pub fn suggest_fix(err: &BackupError) -> Option<String> {
    match err {
        BackupError::Connection { .. } => Some(
            "Suggestions:\n\
             - Check if PostgreSQL is running\n\
             - Verify the connection string is correct\n\
             - Ensure the database exists and you have permission to access it".to_string()
        ),
        BackupError::InvalidConnectionString(_) => Some(
            "Connection string should be in format:\n\
             postgres://[user[:password]@][host][:port][/dbname][?sslmode=...]".to_string()
        ),
        BackupError::SinkOpen { path, .. } => Some(
            format!("Cannot write {}\n\
                    - Check that the directory exists\n\
                    - Check file permissions", path.display())
        ),
        BackupError::CycleDetected(details) => Some(
            format!("Tables reference each other: {}\n\
                    - Run without --strict to emit the tables anyway\n\
                    - Foreign keys along the cycle will need deferred creation on restore", details)
        ),
        BackupError::CatalogQuery { table: Some(table), .. } => Some(
            format!("Check that the connected role can read table '{}' and its catalog entries", table)
        ),
        _ => None,
    }
}
