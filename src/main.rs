//! Artifact Registry CLI - maintenance commands for a registry database

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use artifact_registry::config::{self, RegistryConfig};
use artifact_registry::{
    Artifact, ArtifactQuery, ArtifactRegistry, ArtifactType, LinkHints, ModelRating,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "artifact-registry")]
#[command(version = "0.1.0")]
#[command(about = "Model, dataset and code registry with name-based linking")]
#[command(long_about = r#"
Artifact Registry stores models, datasets and code packages in one table
and links each model to the dataset and code it names.

Example usage:
  artifact-registry init
  artifact-registry smoke
  artifact-registry list --type dataset
  artifact-registry reset --yes
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides config and environment)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Save, read, link and delete throwaway artifacts against the store
    Smoke,

    /// Show artifact and link counts
    Stats,

    /// List artifact metadata
    List {
        /// Artifact type (model, dataset, code); all types when omitted
        #[arg(short = 't', long = "type")]
        artifact_type: Option<ArtifactType>,

        /// Exact name to match ("*" for all)
        #[arg(short, long, default_value = "*")]
        name: String,
    },

    /// Delete every record in the table
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Commands::Init { force } = cli.command {
        let path = cli.config.unwrap_or_else(config::default_config_path);
        config::write_config(&path, &RegistryConfig::default(), force)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("✅ Wrote {}", path.display());
        return Ok(());
    }

    let settings = load_settings(cli.config.as_deref(), cli.database)?;
    let registry = ArtifactRegistry::open(&settings)
        .with_context(|| format!("opening registry at {}", settings.database.display()))?;

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Smoke => {
            println!("🧪 Smoke test against {:?} (table {})", settings.database, settings.table);
            smoke(&registry)?;
            println!("✅ Smoke test passed");
        }

        Commands::Stats => {
            let stats = registry.stats()?;
            println!("📊 Registry Statistics ({:?})", settings.database);
            println!("------------------------------------");
            println!("{}", stats);
        }

        Commands::List { artifact_type, name } => {
            let types = artifact_type.into_iter().collect();
            let results = registry.query_artifacts(&[ArtifactQuery::new(name, types)])?;

            if results.is_empty() {
                println!("∅ No artifacts found.");
            } else {
                for metadata in results {
                    let version = metadata.version.as_deref().unwrap_or("-");
                    println!("- [{}] {} {} ({})", metadata.artifact_type, metadata.name, version, metadata.id);
                }
            }
        }

        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to reset without --yes");
            }
            let removed = registry.reset()?;
            println!("🗑️  Removed {} records", removed);
        }
    }

    Ok(())
}

/// Config file plus environment, with `--database` applied last
fn load_settings(config_path: Option<&Path>, database: Option<PathBuf>) -> anyhow::Result<RegistryConfig> {
    let mut settings = RegistryConfig::load(config_path).context("loading config")?;
    if let Some(database) = database {
        settings.database = database;
    }
    Ok(settings)
}

/// Round trip through every facade operation, cleaning up after itself
fn smoke<S: artifact_registry::RecordStore>(registry: &ArtifactRegistry<S>) -> anyhow::Result<()> {
    let tag = artifact_registry::generate_id();
    let dataset_name = format!("smoke-dataset-{}", tag);
    let dataset_url = format!("https://example.com/datasets/{}", tag);

    let model = Artifact::new(ArtifactType::Model, format!("smoke-model-{}", tag), format!("https://example.com/models/{}", tag))
        .with_version("1.0.0");
    let model_id = registry.save(&model, None, LinkHints::none().dataset(dataset_name.as_str()))?;
    println!("  saved model {}", model_id);

    let dataset = Artifact::new(ArtifactType::Dataset, dataset_name.to_uppercase(), dataset_url.as_str());
    let dataset_id = registry.save(&dataset, None, LinkHints::none())?;
    println!("  saved dataset {}", dataset_id);

    let linked = registry.model_links(&model_id)?.dataset.map(|t| t.id);
    anyhow::ensure!(linked.as_deref() == Some(dataset_id.as_str()), "model not linked to dataset: {:?}", linked);
    println!("  model linked to dataset");

    anyhow::ensure!(registry.artifact_exists(ArtifactType::Dataset, &dataset_url)?, "dataset url not found");
    let found = registry.find_dataset_by_name(&dataset_name)?;
    anyhow::ensure!(found.is_some(), "dataset not found by name");

    let hits = registry.query_artifacts(&[ArtifactQuery::new(dataset_name.as_str(), vec![ArtifactType::Dataset])])?;
    anyhow::ensure!(hits.len() == 1, "expected one query hit, got {}", hits.len());

    let mut rating = ModelRating::zeroed(model.metadata.name.as_str());
    rating.net_score = 0.5;
    registry.set_model_rating(&model_id, &rating)?;
    anyhow::ensure!(registry.get_model_rating(&model_id)? == Some(rating), "rating did not round trip");
    println!("  rating stored");

    registry.delete(&dataset_id, ArtifactType::Dataset)?;
    anyhow::ensure!(registry.model_links(&model_id)?.dataset.is_none(), "link survived dataset delete");
    println!("  link cleared on delete");

    registry.delete(&model_id, ArtifactType::Model)?;
    anyhow::ensure!(
        registry.get(&model_id, ArtifactType::Model).is_err_and(|e| e.is_not_found()),
        "model survived delete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_config_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact-registry.toml");
        std::fs::write(&path, "table = [unterminated").unwrap();

        let err = load_settings(Some(&path), None).unwrap_err();
        assert_eq!(err.to_string(), "loading config");
        assert!(err.chain().count() > 1);
    }

    #[test]
    fn test_database_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cli.db");
        let settings = load_settings(Some(&dir.path().join("missing.toml")), Some(db.clone())).unwrap();
        assert_eq!(settings.database, db);

        let registry = ArtifactRegistry::open(&settings).unwrap();
        assert_eq!(registry.stats().unwrap().total(), 0);
    }
}
