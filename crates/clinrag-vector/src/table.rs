//! LanceDB connection and housekeeping helpers.
use anyhow::Result;
use lancedb::{connect, Connection};
use std::path::Path;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// Remove a local table's data directory (`<db>/<name>.lance`) if present.
pub fn remove_local_table(db_path: &Path, name: &str) -> Result<()> {
    let dir = db_path.join(format!("{name}.lance"));
    if dir.exists() { std::fs::remove_dir_all(&dir)?; }
    Ok(())
}
