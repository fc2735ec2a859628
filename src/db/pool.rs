use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, PooledConnection};
use diesel::sqlite::SqliteConnection;
use r2d2::Pool;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pragmas applied once to each connection the pool opens.
#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Build the pool for `database_url`.
///
/// `:memory:` databases are private to a single connection, so they get a
/// pool of one connection that is never recycled.
pub fn init_pool(database_url: &str, max_size: u32) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let builder = Pool::builder().connection_customizer(Box::new(ConnectionOptions {
        busy_timeout: BUSY_TIMEOUT,
    }));

    let builder = if database_url == ":memory:" {
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder.max_size(max_size.max(1))
    };

    builder.build(manager)
}
