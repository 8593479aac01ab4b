pub mod client;
mod record;

use sqlx::migrate::Migrator;

/// Schema migrations, applied at startup before the server accepts requests.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
