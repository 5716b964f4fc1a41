#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tempfile::TempDir;

use helpdesk::auth::JwtKeys;
use helpdesk::entity::user;
use helpdesk::migration::{Migrator, MigratorTrait};
use helpdesk::notify::{NotificationTransport, Notifier, OutgoingMessage};
use helpdesk::service::{ticket, FileStore, NewPost, NewTicket};
use helpdesk::startup::AppState;

pub const JWT_SECRET: &str = "test-secret";
pub const PASSWORD: &str = "password123";

/// 보낸 메시지를 메모리에 모아두는 전송 방식
#[derive(Default, Clone)]
pub struct RecordingTransport {
    pub sent: Arc<Mutex<Vec<OutgoingMessage>>>,
}

impl RecordingTransport {
    pub fn recipients(&self) -> Vec<String> {
        let sent = self.sent.lock().unwrap();
        let mut to: Vec<String> = sent.iter().map(|m| m.to.clone()).collect();
        to.sort();
        to
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> anyhow::Result<()> {
        self.sent.lock().unwrap().extend(messages);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub transport: RecordingTransport,
    pub alice: user::Model,
    pub bob: user::Model,
    pub carol: user::Model,
    _media: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let alice = create_user(&db, "alice", Some("alice@example.com")).await;
        let bob = create_user(&db, "bob", Some("bob@example.com")).await;
        let carol = create_user(&db, "carol", Some("carol@example.com")).await;

        let media = tempfile::tempdir().unwrap();
        let store = FileStore::new(media.path(), "/media/");
        let transport = RecordingTransport::default();
        let notifier = Notifier::new(Arc::new(transport.clone()), "http://testserver", Duration::from_secs(2));

        Self {
            state: AppState::new(db, JwtKeys::new(JWT_SECRET), store, notifier),
            transport,
            alice,
            bob,
            carol,
            _media: media,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.state.db.get_ref()
    }

    pub fn store(&self) -> &FileStore {
        self.state.store.get_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        self.state.notifier.get_ref()
    }

    pub fn token_for(&self, user: &user::Model) -> String {
        self.state.keys.generate_token(user.id, &user.role).unwrap()
    }

    pub async fn open_ticket(&self, creator: &user::Model, title: &str, message: &str) -> helpdesk::entity::ticket::Model {
        let (created, _) = ticket::create_ticket(
            self.db(),
            self.store(),
            creator.id,
            NewTicket {
                title: title.to_string(),
                ..Default::default()
            },
            NewPost {
                message: message.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        created
    }
}

pub async fn create_user(db: &DatabaseConnection, username: &str, email: Option<&str>) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.map(str::to_string)),
        password: Set(bcrypt::hash(PASSWORD, 4).unwrap()),
        role: Set("user".to_string()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// 백그라운드 알림 태스크가 끝날 때까지 잠시 기다린다.
pub async fn wait_for_messages(transport: &RecordingTransport, expected: usize) {
    for _ in 0..50 {
        if transport.sent.lock().unwrap().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
