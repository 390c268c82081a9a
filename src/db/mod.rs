use anyhow::Result;
use tokio_rusqlite::Connection;

pub mod scans;

pub async fn init(path: &str) -> Result<Connection> {
    let conn = Connection::open(path).await?;

    conn.call(|conn| {
        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)?;

        // One writer (the engine's workers) alongside concurrent query readers
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok::<(), tokio_rusqlite::rusqlite::Error>(())
    })
    .await?;

    Ok(conn)
}
