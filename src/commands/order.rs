use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::backup::resolve_tables;
use crate::catalog::{Catalog, PgCatalog};
use crate::commands::backup::database_config;
use crate::config::SchemadumpConfig;
use crate::error::{BackupError, Result};

/// Emission order of one schema, without writing a backup
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub database: String,
    pub order: Vec<String>,
    /// Referenced tables of each table that references any
    pub references: BTreeMap<String, Vec<String>>,
    pub cycles: Vec<Vec<String>>,
    pub skipped: Vec<SkippedTable>,
    #[serde(skip)]
    pub graphviz: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedTable {
    pub name: String,
    pub reason: String,
}

impl OrderResult {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "database": self.database,
            "order": self.order,
            "references": self.references,
            "cycles": self.cycles,
            "skipped": self.skipped,
        })
    }
}

/// Resolve the emission order of `catalog`
pub async fn plan_order(catalog: &dyn Catalog) -> Result<OrderResult> {
    let (resolution, graph, skipped) = resolve_tables(catalog).await?;

    let references = resolution
        .order
        .iter()
        .filter_map(|table| {
            let referenced = graph.dependencies_of(table);
            (!referenced.is_empty()).then(|| {
                (
                    table.to_string(),
                    referenced.iter().map(ToString::to_string).collect(),
                )
            })
        })
        .collect();

    Ok(OrderResult {
        database: catalog.database_name().to_string(),
        order: resolution.order.iter().map(ToString::to_string).collect(),
        references,
        cycles: resolution
            .cycles
            .iter()
            .map(|cycle| cycle.tables.iter().map(ToString::to_string).collect())
            .collect(),
        skipped: skipped
            .into_iter()
            .map(|(name, reason)| SkippedTable {
                name,
                reason: reason.to_string(),
            })
            .collect(),
        graphviz: graph.to_graphviz(),
    })
}

pub fn write_graph(result: &OrderResult, path: &Path) -> Result<()> {
    fs::write(path, &result.graphviz).map_err(|e| BackupError::SinkOpen {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("Dependency graph written to {}", path.display());
    Ok(())
}

pub async fn execute_order(config: &SchemadumpConfig) -> Result<OrderResult> {
    let db_config = database_config(config)?;
    let catalog = PgCatalog::connect(
        &db_config,
        config.schema_or_default(),
        config.statement_timeout(),
    )
    .await?;

    plan_order(&catalog).await
}

#[cfg(feature = "cli")]
pub fn print_order_summary(result: &OrderResult) {
    use owo_colors::OwoColorize;

    println!("\n{}", format!("=== Emission order for {} ===", result.database).bold().blue());
    for (position, table) in result.order.iter().enumerate() {
        match result.references.get(table) {
            Some(referenced) => println!(
                "  {:>4}. {} {}",
                position + 1,
                table.cyan(),
                format!("-> {}", referenced.join(", ")).dimmed()
            ),
            None => println!("  {:>4}. {}", position + 1, table.cyan()),
        }
    }

    if !result.cycles.is_empty() {
        println!("\n{}:", "Circular foreign keys".bold().yellow());
        for cycle in &result.cycles {
            let mut path = cycle.clone();
            if let Some(first) = cycle.first() {
                path.push(first.clone());
            }
            println!("  {} {}", "↻".yellow(), path.join(" -> "));
        }
    }

    if !result.skipped.is_empty() {
        println!("\n{}:", "Skipped".bold().yellow());
        for skipped in &result.skipped {
            println!("  {} {:?}: {}", "⚠".yellow(), skipped.name, skipped.reason);
        }
    }
}
