use crate::config::ApiConfig;
use crate::database::Database;
use std::path::PathBuf;
use std::sync::Arc;

/// Returns the default path of the leadline database
///
/// # Platform-specific paths
///
/// - **macOS**: `~/Library/Application Support/leadline/leadline.db`
/// - **Linux**: `~/.local/share/leadline/leadline.db`
/// - **Windows**: `%LOCALAPPDATA%\leadline\leadline.db`
pub fn get_db_path() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(data_dir.join("leadline").join("leadline.db"))
}

/// Directory holding call recordings when the config does not name one.
pub fn get_recordings_dir(config: &ApiConfig) -> anyhow::Result<PathBuf> {
    if let Some(root) = &config.recordings.root_dir {
        return Ok(root.clone());
    }
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;
    Ok(data_dir.join("leadline").join("recordings"))
}

/// Initialize the database connection
pub fn initialize_database(config: &ApiConfig) -> anyhow::Result<(Arc<Database>, PathBuf)> {
    let db_path = match &config.database.path {
        Some(path) => path.clone(),
        None => get_db_path()?,
    };

    let db = Database::new(&db_path, config.database.pool_size)?;
    Ok((Arc::new(db), db_path))
}
