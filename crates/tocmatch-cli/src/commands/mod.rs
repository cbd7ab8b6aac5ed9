pub mod build;
pub mod config;
pub mod import;
pub mod lookup;
pub mod serve;
pub mod status;

pub use build::run_build;
pub use import::run_import;
pub use lookup::run_lookup;
pub use serve::run_serve;
pub use status::show_status;
