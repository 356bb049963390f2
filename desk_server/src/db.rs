//! Database connection pool (diesel-async + deadpool).

use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

pub type PgPool = Pool<AsyncPgConnection>;
pub type PgConn = Object<AsyncPgConnection>;

/// Build the connection pool and verify the database is reachable.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(10)
        .build()
        .map_err(|e| anyhow::anyhow!("pool build: {e}"))?;

    pool.get()
        .await
        .map_err(|e| anyhow::anyhow!("database unreachable: {e}"))?;

    Ok(pool)
}
