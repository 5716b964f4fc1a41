//! 티켓 게시글 알림.
//!
//! 수신자는 작성자/담당자/팔로워의 합집합에서 제외 대상과 연락처 없는 사용자를 뺀 집합이다.
//! 발송은 best-effort: 실패는 로그만 남기고 호출자에게 전파하지 않는다.

mod transport;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::configuration::{MailBackend, MailSettings};
use crate::entity::{ticket, ticket_follower, ticket_post, user};

pub use transport::{ConsoleTransport, NotificationTransport, SmtpTransport, WebhookTransport};

const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn NotificationTransport>,
    site_url: String,
    timeout: Duration,
}

impl Notifier {
    pub fn new(transport: Arc<dyn NotificationTransport>, site_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            site_url: site_url.into(),
            timeout,
        }
    }

    pub fn from_settings(mail: &MailSettings, site_url: &str) -> anyhow::Result<Self> {
        let transport: Arc<dyn NotificationTransport> = match mail.backend {
            MailBackend::Console => Arc::new(ConsoleTransport),
            MailBackend::Smtp => {
                let smtp = mail
                    .smtp
                    .clone()
                    .ok_or_else(|| anyhow!("MAIL_BACKEND=smtp requires SMTP_HOST"))?;
                Arc::new(SmtpTransport::new(smtp, mail.from.clone(), mail.timeout))
            }
            MailBackend::Webhook => {
                let url = mail
                    .webhook_url
                    .clone()
                    .ok_or_else(|| anyhow!("MAIL_BACKEND=webhook requires MAIL_WEBHOOK_URL"))?;
                Arc::new(WebhookTransport::new(url, mail.timeout)?)
            }
        };

        info!(backend = transport.name(), "알림 전송 방식 설정 완료");
        Ok(Self::new(transport, site_url, mail.timeout))
    }

    /// 발송을 백그라운드 태스크로 넘기고 바로 반환한다.
    pub fn dispatch(
        &self,
        db: DatabaseConnection,
        ticket: ticket::Model,
        post: ticket_post::Model,
        exclude_user: Option<i32>,
    ) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify(&db, &ticket, &post, exclude_user).await;
        });
    }

    #[instrument(skip_all, fields(ticket_id = ticket.id, post_id = post.id))]
    pub async fn notify(
        &self,
        db: &DatabaseConnection,
        ticket: &ticket::Model,
        post: &ticket_post::Model,
        exclude_user: Option<i32>,
    ) {
        let messages = match self.messages_for(db, ticket, post, exclude_user).await {
            Ok(messages) => messages,
            Err(err) => {
                error!(error = %err, "알림 수신자 조회 실패");
                return;
            }
        };

        if messages.is_empty() {
            debug!("알림 수신자가 없습니다");
            return;
        }

        let count = messages.len();
        match tokio::time::timeout(self.timeout, self.transport.send_batch(messages)).await {
            Ok(Ok(())) => info!(recipients = count, transport = self.transport.name(), "알림 발송 완료"),
            Ok(Err(err)) => error!(error = %err, transport = self.transport.name(), "알림 발송 실패"),
            Err(_) => error!(
                timeout_secs = self.timeout.as_secs(),
                transport = self.transport.name(),
                "알림 발송 시간 초과"
            ),
        }
    }

    async fn messages_for(
        &self,
        db: &DatabaseConnection,
        ticket: &ticket::Model,
        post: &ticket_post::Model,
        exclude_user: Option<i32>,
    ) -> Result<Vec<OutgoingMessage>, DbErr> {
        let creator = find_user(db, ticket.created_by).await?;
        let assignee = find_user(db, ticket.assigned_to).await?;
        let author = find_user(db, post.user_id).await?;

        let follower_ids: Vec<i32> = ticket_follower::Entity::find()
            .select_only()
            .column(ticket_follower::Column::UserId)
            .filter(ticket_follower::Column::TicketId.eq(ticket.id))
            .into_tuple()
            .all(db)
            .await?;
        let followers = if follower_ids.is_empty() {
            Vec::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(follower_ids))
                .all(db)
                .await?
        };

        let author_name = author.as_ref().map(|u| u.username.as_str());
        Ok(recipients(creator, assignee, followers, exclude_user)
            .iter()
            .filter_map(|recipient| {
                recipient
                    .contact_address()
                    .map(|address| self.compose(address, ticket, post, author_name))
            })
            .collect())
    }

    pub fn compose(
        &self,
        to: &str,
        ticket: &ticket::Model,
        post: &ticket_post::Model,
        author: Option<&str>,
    ) -> OutgoingMessage {
        let subject = format!("Ticket #{} Update: {}", ticket.id, ticket.title);
        let body = format!(
            "A new update has been posted to ticket #{id}.\n\n\
             Title: {title}\n\
             Updated by: {author}\n\n\
             Message:\n{message}\n\n\
             View ticket: {link}\n",
            id = ticket.id,
            title = ticket.title,
            author = author.unwrap_or(UNKNOWN_AUTHOR),
            message = post.message,
            link = self.ticket_link(ticket.id),
        );

        OutgoingMessage {
            to: to.to_string(),
            subject,
            body,
        }
    }

    pub fn ticket_link(&self, ticket_id: i32) -> String {
        format!("{}/view-ticket/{}/", self.site_url.trim_end_matches('/'), ticket_id)
    }
}

async fn find_user(db: &DatabaseConnection, id: Option<i32>) -> Result<Option<user::Model>, DbErr> {
    match id {
        Some(id) => user::Entity::find_by_id(id).one(db).await,
        None => Ok(None),
    }
}

/// 작성자, 담당자, 팔로워 순서로 중복 없이 모은다.
pub fn recipients(
    creator: Option<user::Model>,
    assignee: Option<user::Model>,
    followers: Vec<user::Model>,
    exclude_user: Option<i32>,
) -> Vec<user::Model> {
    let mut seen = HashSet::new();

    creator
        .into_iter()
        .chain(assignee)
        .chain(followers)
        .filter(|u| Some(u.id) != exclude_user)
        .filter(|u| u.contact_address().is_some())
        .filter(|u| seen.insert(u.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i32, name: &str, email: Option<&str>) -> user::Model {
        user::Model {
            id,
            username: name.to_string(),
            email: email.map(str::to_string),
            password: String::new(),
            role: "user".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ids(users: &[user::Model]) -> Vec<i32> {
        users.iter().map(|u| u.id).collect()
    }

    #[test]
    fn excluded_assignee_is_dropped_and_followers_deduplicated() {
        let a = user(1, "alice", Some("a@example.com"));
        let b = user(2, "bob", Some("b@example.com"));
        let c = user(3, "carol", Some("c@example.com"));

        let result = recipients(Some(a), Some(b.clone()), vec![b, c.clone(), c], Some(2));
        assert_eq!(ids(&result), vec![1, 3]);
    }

    #[test]
    fn creator_who_is_also_assignee_gets_one_message() {
        let a = user(1, "alice", Some("a@example.com"));
        let result = recipients(Some(a.clone()), Some(a.clone()), vec![a], None);
        assert_eq!(ids(&result), vec![1]);
    }

    #[test]
    fn users_without_address_are_skipped() {
        let a = user(1, "alice", None);
        let b = user(2, "bob", Some("   "));
        let c = user(3, "carol", Some("c@example.com"));
        let result = recipients(Some(a), Some(b), vec![c], None);
        assert_eq!(ids(&result), vec![3]);
    }

    #[test]
    fn message_names_unknown_author_and_links_ticket() {
        let notifier = Notifier::new(Arc::new(ConsoleTransport), "https://help.example.com/", Duration::from_secs(1));
        let now = Utc::now();
        let ticket = ticket::Model {
            id: 42,
            title: "Printer jam".to_string(),
            created_by: None,
            type_id: None,
            department_id: None,
            status_id: None,
            priority: ticket::Priority::High,
            assigned_to: None,
            sentiment: None,
            created_at: now,
            updated_at: now,
        };
        let post = ticket_post::Model {
            id: 7,
            ticket_id: 42,
            user_id: None,
            message: "Paper stuck in tray 2".to_string(),
            private: false,
            upload: None,
            upload_checksum: None,
            created_at: now,
            updated_at: now,
        };

        let message = notifier.compose("a@example.com", &ticket, &post, None);
        assert_eq!(message.subject, "Ticket #42 Update: Printer jam");
        assert!(message.body.contains("Updated by: Unknown"));
        assert!(message.body.contains("Paper stuck in tray 2"));
        assert!(message.body.contains("View ticket: https://help.example.com/view-ticket/42/"));
    }
}
