use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{traits::MarketplaceDatabase, SqliteDatabase};

/// Creates a fresh database at `url`, migrates it and returns a connection pool to it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 25).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/farmstand_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        debug!("🚀️ Could not drop database {url} (it probably does not exist yet): {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

pub async fn remove_database(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Error dropping database {url}: {e:?}");
    }
}
