use tracing::info;

use crate::config::load_config;
use crate::error::BoxsyncError;

use super::connection::connect_to_source;

/// Materialize one file given its `<id>|||<name>` identifier.
pub async fn run_fetch(
    config_path: Option<&str>,
    source: &str,
    identifier: &str,
) -> Result<(), BoxsyncError> {
    let config = load_config(config_path)?;
    let source = connect_to_source(&config, source)?;
    let path = source.path_for_identifier(identifier).await?;
    println!("{}", path.display());
    Ok(())
}

/// List a source and materialize every file, one local path per line.
///
/// Stops at the first failure; files cached before it stay cached.
pub async fn run_sync(config_path: Option<&str>, source: &str) -> Result<(), BoxsyncError> {
    let config = load_config(config_path)?;
    let source = connect_to_source(&config, source)?;
    let entries = source.generate_file_collection().await?;

    for entry in &entries {
        let path = source.path_to_local_file(entry).await?;
        println!("{}", path.display());
    }
    info!(
        source = source.id(),
        files = entries.len(),
        dir = %source.cache().dir().display(),
        "Sync complete"
    );
    Ok(())
}
