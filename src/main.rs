use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{App, HttpServer};
use tracing::info;

use helpdesk::auth::JwtKeys;
use helpdesk::configuration::Settings;
use helpdesk::db::init_db;
use helpdesk::migration::{Migrator, MigratorTrait};
use helpdesk::notify::Notifier;
use helpdesk::sentiment;
use helpdesk::service::FileStore;
use helpdesk::startup::AppState;
use helpdesk::telemetry::{get_subscriber, init_subscriber};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        "helpdesk".into(),
        "info,sqlx=warn".into(),
        std::io::stdout
    );
    init_subscriber(subscriber)?;

    info!("애플리케이션 시작 중...");

    let settings = Settings::from_env()?;
    info!("환경 변수 로드 완료");

    let db = init_db(&settings.database_url).await?;
    info!("데이터베이스 마이그레이션 실행 중...");
    Migrator::up(&db, None).await?;
    info!("마이그레이션 완료");

    sentiment::init();

    let notifier = Notifier::from_settings(&settings.mail, &settings.site_url)?;
    let store = FileStore::new(settings.media_root.clone(), settings.media_url.clone());
    let state = AppState::new(db, JwtKeys::new(&settings.jwt_secret), store, notifier);

    info!("서버 시작 중: http://{}:{}", settings.host, settings.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .configure(|cfg| state.configure(cfg))
    })
        .bind((settings.host.as_str(), settings.port))?
        .run()
        .await?;

    Ok(())
}
