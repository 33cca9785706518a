use schemadump::{
    cli::{Cli, Commands},
    commands::{execute_backup, execute_order, print_backup_summary, print_order_summary, write_graph},
    config::{CliOverrides, SchemadumpConfig},
    error::{format_error_chain, suggest_fix, BackupError, Result},
    logging,
    output::CliOutputHandler,
};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    let cli = Cli::parse_args();

    // Verbosity: 0 = warn, 1 = info, 2 = debug, 3+ = trace
    logging::init(cli.verbose).map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    info!("Starting schemadump v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", cli.command);

    let writes_script = matches!(cli.command, Commands::Backup { .. });

    if let Err(e) = run(cli).await {
        logging::output::error(format_error_chain(&e));
        if let Some(suggestion) = suggest_fix(&e) {
            eprintln!("{}", suggestion);
        }
        if writes_script && !e.is_fatal_before_output() {
            logging::output::warning("The backup output is incomplete, statements written before the error were kept");
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = SchemadumpConfig::load_from_file()?;
    if config_file.is_some() {
        info!("Loaded configuration from schemadump.toml");
    }

    match cli.command {
        Commands::Init => {
            logging::output::step("Generating sample configuration file...");
            let current_dir = std::env::current_dir()
                .map_err(|e| BackupError::Configuration(format!("Cannot read current directory: {}", e)))?;
            let path = SchemadumpConfig::write_sample_config(&current_dir)?;
            logging::output::success(format!(
                "Created {} - rename to schemadump.toml to use",
                path.display()
            ));
            Ok(())
        }

        Commands::Backup { database, connection_string, schema, output, strict, no_header } => {
            logging::output::header("Backing up database");

            let config = SchemadumpConfig::merge_with_cli(
                config_file,
                CliOverrides {
                    connection_string,
                    database,
                    schema,
                    output,
                    strict,
                    no_header,
                },
            );

            let result = execute_backup(&config, &CliOutputHandler).await?;
            info!("Backup completed in {}", logging::format_duration(result.report.duration));

            print_backup_summary(&result);
            Ok(())
        }

        Commands::Order { connection_string, schema, json, output_graph } => {
            let config = SchemadumpConfig::merge_with_cli(
                config_file,
                CliOverrides {
                    connection_string,
                    schema,
                    ..Default::default()
                },
            );

            let result = execute_order(&config).await?;

            if let Some(path) = &output_graph {
                write_graph(&result, path)?;
                logging::output::success(format!("Dependency graph written to {}", path.display()));
            }

            if json {
                let rendered = serde_json::to_string_pretty(&result.to_json())
                    .map_err(|e| BackupError::Other(e.to_string()))?;
                println!("{}", rendered);
            } else {
                print_order_summary(&result);
            }

            if !result.cycles.is_empty() {
                logging::output::warning(format!(
                    "{} foreign key cycle(s) found, emission order is best effort",
                    result.cycles.len()
                ));
            }
            Ok(())
        }
    }
}
