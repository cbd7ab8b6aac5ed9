use anyhow::Result;
use tocmatch_core::schema::Database;
use tocmatch_etl::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;

    let tracklists = db.count_tracklists()?;
    let tracks = db.count_tracks()?;

    println!("\n📊 Tocmatch Status\n");
    println!("  Catalog: {}", config.database_path.display());
    println!("  Tracklists: {}", tracklists);
    println!("  Tracks: {}", tracks);

    if tracklists == 0 {
        println!("\n  Run `tocmatch import <file>` to load tracklists");
    }

    Ok(())
}
