use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tocmatch_core::schema::Database;
use tocmatch_core::TrackRow;
use tocmatch_etl::Config;

/// Rows written per transaction.
const IMPORT_BATCH: usize = 10_000;

/// Load `tracklist_id position duration_ms` lines into the catalog.
pub fn run_import(config: &Config, file: &Path) -> Result<()> {
    log::info!("Importing catalog rows from {}", file.display());

    let db = Database::open(&config.database_path).context("Failed to open catalog")?;
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );

    let imported = import_rows(&db, reader)?;

    println!("✓ Imported {} rows from {}", imported, file.display());
    println!(
        "  Catalog now holds {} tracklists",
        db.count_tracklists()?
    );
    Ok(())
}

fn import_rows(db: &Database, reader: impl BufRead) -> Result<usize> {
    let mut batch = Vec::with_capacity(IMPORT_BATCH);
    let mut imported = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read rows file")?;
        let line_number = index + 1;
        let Some(row) = parse_line(&line)
            .with_context(|| format!("Malformed row on line {line_number}"))?
        else {
            continue;
        };

        batch.push(row);
        if batch.len() == IMPORT_BATCH {
            imported += db.insert_tracks(&batch)?;
            log::debug!("Imported {} rows", imported);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        imported += db.insert_tracks(&batch)?;
    }

    Ok(imported)
}

/// Parse one rows-file line. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Result<Option<TrackRow>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [tracklist_id, position, duration_ms] = fields.as_slice() else {
        bail!("expected 3 fields, found {}", fields.len());
    };

    Ok(Some(TrackRow::new(
        tracklist_id
            .parse()
            .with_context(|| format!("bad tracklist id {tracklist_id:?}"))?,
        position
            .parse()
            .with_context(|| format!("bad position {position:?}"))?,
        duration_ms
            .parse()
            .with_context(|| format!("bad duration {duration_ms:?}"))?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("12 3 184666").unwrap(),
            Some(TrackRow::new(12, 3, 184_666))
        );
        assert_eq!(
            parse_line("  12\t3\t0  ").unwrap(),
            Some(TrackRow::new(12, 3, 0))
        );
    }

    #[test]
    fn test_parse_line_skips_blank_and_comments() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# tracklist position duration").unwrap(), None);
    }

    #[test]
    fn test_parse_line_rejects_bad_rows() {
        assert!(parse_line("12 3").is_err());
        assert!(parse_line("12 3 100 7").is_err());
        assert!(parse_line("-1 3 100").is_err());
        assert!(parse_line("12 three 100").is_err());
    }

    #[test]
    fn test_import_rows() {
        let db = Database::open_in_memory().unwrap();
        let input = "# sample\n1 1 200000\n1 2 210000\n\n2 1 500000\n";

        let imported = import_rows(&db, Cursor::new(input)).unwrap();
        assert_eq!(imported, 3);
        assert_eq!(db.count_tracklists().unwrap(), 2);
    }

    #[test]
    fn test_import_names_bad_line() {
        let db = Database::open_in_memory().unwrap();
        let input = "1 1 200000\n1 x 210000\n";

        let err = import_rows(&db, Cursor::new(input)).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
