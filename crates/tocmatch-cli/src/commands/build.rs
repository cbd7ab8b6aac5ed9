use anyhow::{Context, Result};
use tocmatch_core::schema::Database;
use tocmatch_etl::{BuiltIndex, Config, IndexBuilder};

/// Build a fresh index from the configured catalog.
pub fn build_index(config: &Config) -> Result<BuiltIndex> {
    let db = Database::open(&config.database_path).context("Failed to open catalog")?;
    let built = IndexBuilder::new()
        .build_from_database(&db, config.chunk_size)
        .context("Index build failed")?;
    Ok(built)
}

pub fn run_build(config: &Config) -> Result<()> {
    let built = build_index(config)?;
    let stats = &built.stats;

    println!("\n📀 Index built\n");
    println!("  Catalog: {}", config.database_path.display());
    println!("  Rows read: {} in {} chunks", stats.rows, stats.chunks);
    println!("  Tracklists: {}", stats.tracklists);
    println!("  Indexed: {}", stats.indexed);
    println!("  Dropped (missing duration): {}", stats.dropped_missing_duration);
    println!("  Dropped (too few tracks): {}", stats.dropped_too_short);
    println!("  Tree depth: {}", built.index.depth());
    println!("  Elapsed: {:.2?}", stats.elapsed);

    Ok(())
}
