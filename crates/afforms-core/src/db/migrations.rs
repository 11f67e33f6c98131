use sqlx::sqlite::SqlitePool;
use std::fmt;

#[derive(Clone, Debug)]
pub struct Migration {
    version: i32,
    up: &'static str,
}

impl Migration {
    pub const fn new(version: i32, up: &'static str) -> Self {
        Self { version, up }
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Migration {}", self.version)
    }
}

pub const MIGRATIONS: &[Migration] = &[Migration::new(
    1,
    r#"
    CREATE TABLE IF NOT EXISTS forms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        form_number TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        pdf_url TEXT NOT NULL,
        last_updated TEXT NOT NULL
    )
    "#,
)];

pub async fn apply_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let applied_versions: Vec<i32> =
        sqlx::query_scalar("SELECT version FROM migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            sqlx::query(migration.up).execute(pool).await?;

            sqlx::query("INSERT INTO migrations (version, applied_at) VALUES (?, ?)")
                .bind(migration.version)
                .bind(chrono::Utc::now())
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}
