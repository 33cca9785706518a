pub mod connection;
pub mod tls;

pub use connection::{DatabaseConfig, connect_to_database};
pub use tls::{TlsMode, TlsConfig, PgConnection};
