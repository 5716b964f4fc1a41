use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, instrument};

#[instrument(skip(database_url))]
pub async fn init_db(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("데이터베이스 연결 설정 중...");

    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(10)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    info!("데이터베이스에 연결 시도 중...");
    let db = Database::connect(options).await?;
    info!("데이터베이스 연결 완료");

    Ok(db)
}
