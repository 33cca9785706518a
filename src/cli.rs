use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[command(name = "schemadump")]
#[command(about = "Dependency-ordered PostgreSQL schema and data backups")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Increase verbosity level (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Generate a sample configuration file
    Init,

    /// Write a script that recreates the schema and data of a database
    Backup {
        /// Database to back up (defaults to the one in the connection string)
        #[arg(long)]
        database: Option<String>,

        /// PostgreSQL connection string
        #[arg(long)]
        connection_string: Option<String>,

        /// Schema to back up (default: public)
        #[arg(long)]
        schema: Option<String>,

        /// Output file, `-` for stdout (default: database_backup_<database>.sql)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Fail when foreign keys form a cycle
        #[arg(long)]
        strict: bool,

        /// Omit the header comment
        #[arg(long)]
        no_header: bool,
    },

    /// Print the order tables would be written in
    Order {
        /// PostgreSQL connection string
        #[arg(long)]
        connection_string: Option<String>,

        /// Schema to inspect (default: public)
        #[arg(long)]
        schema: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Write the foreign key graph in Graphviz DOT format to the specified file
        #[arg(long)]
        output_graph: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
