use anyhow::Result;
use tocmatch_etl::{config, Config};

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    println!("  database_path: {}", config.database_path.display());
    println!("  bind: {}", config.bind);
    println!("  port: {}", config.port);
    println!("  workers: {}", config.workers);
    println!("  default_threshold_ms: {}", config.default_threshold_ms);
    println!("  chunk_size: {}", config.chunk_size);
    println!(
        "  rebuild_interval_secs: {}",
        config
            .rebuild_interval_secs
            .map_or_else(|| String::from("<not set>"), |secs| secs.to_string())
    );
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: CLI args > ENV vars (TOCM_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    let config_path = config::config_file_path();
    println!("{}", config_path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure tocmatch.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
