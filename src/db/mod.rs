use crate::config::DatabaseConfig;
use crate::error::ApiError;
use crate::models::QuizKind;
use deadpool_postgres::{Config, Object, Pool, PoolConfig, Runtime};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::NoTls;
use tracing::{error, info, warn};

mod accounts;
mod articles;
mod quizzes;

/// Repository over the PostgreSQL pool. Every query the handlers need is a
/// method on this type; the methods are split across the submodules by table.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Builds the pool and checks that a connection can be made.
    pub async fn new(config: DatabaseConfig) -> Result<Self, ApiError> {
        info!("Creating PostgreSQL connection pool for host: {}:{}", config.host, config.port);

        let db = Database { pool: Self::create_pool(config)? };
        db.health_check().await?;

        Ok(db)
    }

    /// Builds the pool without opening a connection.
    #[cfg(test)]
    pub(crate) fn lazy(config: DatabaseConfig) -> Result<Self, ApiError> {
        Ok(Database { pool: Self::create_pool(config)? })
    }

    fn create_pool(config: DatabaseConfig) -> Result<Pool, ApiError> {
        let mut pg_config = Config::new();

        if let Some(url) = config.connection_string {
            pg_config.url = Some(url);
        } else {
            pg_config.host = Some(config.host);
            pg_config.port = Some(config.port);
            pg_config.dbname = Some(config.database);
            pg_config.user = Some(config.username);
            pg_config.password = Some(config.password);
        }

        pg_config.ssl_mode = Some(match config.ssl_mode.as_str() {
            "disable" => deadpool_postgres::SslMode::Disable,
            "require" => deadpool_postgres::SslMode::Require,
            "prefer" => deadpool_postgres::SslMode::Prefer,
            other => {
                warn!("Unknown SSL mode '{}', defaulting to 'prefer'", other);
                deadpool_postgres::SslMode::Prefer
            }
        });

        pg_config.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(config.max_connections as usize);
        pool_config.timeouts.wait = Some(config.connection_timeout);
        pool_config.timeouts.create = Some(config.connection_timeout);
        pool_config.timeouts.recycle = Some(config.connection_timeout);
        pg_config.pool = Some(pool_config);

        let pool = if config.ssl_mode == "disable" {
            pg_config.create_pool(Some(Runtime::Tokio1), NoTls)
        } else {
            let tls_connector = TlsConnector::builder()
                .build()
                .map_err(|e| {
                    error!("Failed to create TLS connector: {}", e);
                    ApiError::Database(format!("TLS connector creation failed: {}", e))
                })?;
            pg_config.create_pool(Some(Runtime::Tokio1), MakeTlsConnector::new(tls_connector))
        };

        pool.map_err(|e| {
            error!("Failed to create connection pool: {}", e);
            ApiError::Database(format!("Connection pool creation failed: {}", e))
        })
    }

    async fn get_connection(&self) -> Result<Object, ApiError> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[])
            .await
            .map_err(|e| {
                error!("Database health check failed: {}", e);
                ApiError::Database(format!("Health check failed: {}", e))
            })?;

        info!("Database health check successful");
        Ok(())
    }

    /// Creates the schema if it is missing. Safe to run on every start.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        info!("Running database migrations");

        let client = self.get_connection().await?;

        let mut statements = vec![
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) UNIQUE NOT NULL,
                password TEXT NOT NULL,
                token TEXT,
                image_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#.to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS admins (
                id SERIAL PRIMARY KEY,
                email VARCHAR(255) UNIQUE NOT NULL,
                password TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#.to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id SERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                writer_by VARCHAR(255) NOT NULL,
                date DATE NOT NULL DEFAULT CURRENT_DATE,
                content TEXT NOT NULL,
                image_url TEXT NOT NULL
            )
            "#.to_string(),
            "CREATE INDEX IF NOT EXISTS idx_articles_title ON articles(LOWER(title))".to_string(),
        ];

        for kind in QuizKind::ALL {
            statements.push(format!(
                r#"
                CREATE TABLE IF NOT EXISTS {quiz} (
                    id SERIAL PRIMARY KEY,
                    text VARCHAR(500) UNIQUE NOT NULL,
                    level INTEGER NOT NULL,
                    is_open BOOLEAN NOT NULL DEFAULT TRUE
                )
                "#,
                quiz = kind.table(),
            ));
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{quiz}_level ON {quiz}(level)",
                quiz = kind.table(),
            ));
            statements.push(format!(
                r#"
                CREATE TABLE IF NOT EXISTS {history} (
                    id SERIAL PRIMARY KEY,
                    id_user INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    id_quiz INTEGER NOT NULL REFERENCES {quiz}(id) ON DELETE CASCADE,
                    is_answered BOOLEAN NOT NULL DEFAULT FALSE,
                    checker TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                history = kind.history_table(),
                quiz = kind.table(),
            ));
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{history}_user_quiz ON {history}(id_user, id_quiz)",
                history = kind.history_table(),
            ));
        }

        for statement in &statements {
            client.execute(statement.as_str(), &[])
                .await
                .map_err(|e| {
                    error!("Migration statement failed: {}", e);
                    ApiError::Database(format!("Migration failed: {}", e))
                })?;
        }

        info!("Database migrations completed successfully ({} statements)", statements.len());
        Ok(())
    }
}
