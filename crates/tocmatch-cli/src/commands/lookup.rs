use anyhow::{Context, Result};
use tocmatch_core::Toc;
use tocmatch_etl::Config;
use tocmatch_search::{format_matches, lookup};

use super::build::build_index;

/// Build the index and print the matches for one TOC.
pub fn run_lookup(config: &Config, raw_toc: &str, distance: Option<u64>) -> Result<()> {
    // Reject a bad TOC before paying for a build.
    Toc::parse(raw_toc).with_context(|| format!("Invalid toc passed: {raw_toc:?}"))?;

    let threshold_ms = distance.unwrap_or(config.default_threshold_ms);
    let built = build_index(config)?;

    let matches = lookup(&built.index, raw_toc, threshold_ms)?;
    log::info!(
        "{} matches within {} ms for {}",
        matches.len(),
        threshold_ms,
        raw_toc
    );
    println!("{}", format_matches(&matches)?);

    Ok(())
}
