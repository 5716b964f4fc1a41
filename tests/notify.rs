mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use httptest::matchers::{all_of, json_decoded, request};
use httptest::responders::status_code;
use httptest::{Expectation, Server};
use serde_json::Value;

use common::{create_user, wait_for_messages, TestApp};
use helpdesk::notify::{NotificationTransport, Notifier, OutgoingMessage, WebhookTransport};
use helpdesk::service::{ticket as tickets, view, NewPost};

fn message(to: &str) -> OutgoingMessage {
    OutgoingMessage {
        to: to.to_string(),
        subject: "Ticket #1 Update: Printer jam".to_string(),
        body: "Paper stuck".to_string(),
    }
}

#[tokio::test]
async fn webhook_posts_the_whole_batch() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/hook"),
            request::body(json_decoded(|body: &Value| body["messages"].as_array().map(Vec::len) == Some(2))),
        ])
        .respond_with(status_code(200)),
    );

    let transport = WebhookTransport::new(server.url_str("/hook"), Duration::from_secs(2)).unwrap();
    transport
        .send_batch(vec![message("a@example.com"), message("b@example.com")])
        .await
        .unwrap();
}

#[tokio::test]
async fn webhook_error_status_is_reported() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/hook"))
            .respond_with(status_code(500)),
    );

    let transport = WebhookTransport::new(server.url_str("/hook"), Duration::from_secs(2)).unwrap();
    let result = transport.send_batch(vec![message("a@example.com")]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn webhook_summary_names_subject_and_recipient() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/hook"),
            request::body(json_decoded(|body: &Value| {
                body["text"] == "Ticket #1 Update: Printer jam -> a@example.com"
            })),
        ])
        .respond_with(status_code(204)),
    );

    let transport = WebhookTransport::new(server.url_str("/hook"), Duration::from_secs(2)).unwrap();
    transport.send_batch(vec![message("a@example.com")]).await.unwrap();
}

#[tokio::test]
async fn reply_notifies_creator_and_followers_but_not_author() {
    let app = TestApp::spawn().await;
    let dan = create_user(app.db(), "dan", None).await;
    let ticket = app.open_ticket(&app.alice, "Printer jam", "Paper stuck in tray 2").await;
    tickets::assign_to_user(app.db(), ticket.id, app.bob.id).await.unwrap();
    tickets::toggle_follow(app.db(), ticket.id, app.carol.id).await.unwrap();
    tickets::toggle_follow(app.db(), ticket.id, dan.id).await.unwrap();

    tickets::add_post(
        app.db(),
        app.store(),
        app.notifier(),
        ticket.id,
        app.bob.id,
        NewPost {
            message: "Replaced the roller".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    wait_for_messages(&app.transport, 2).await;
    assert_eq!(
        app.transport.recipients(),
        vec!["alice@example.com".to_string(), "carol@example.com".to_string()]
    );

    let sent = app.transport.sent.lock().unwrap().clone();
    assert!(sent.iter().all(|m| m.subject == format!("Ticket #{} Update: Printer jam", ticket.id)));
    assert!(sent.iter().all(|m| m.body.contains("Updated by: bob")));
    assert!(sent[0].body.contains(&format!("http://testserver/view-ticket/{}/", ticket.id)));
}

struct StalledTransport;

#[async_trait]
impl NotificationTransport for StalledTransport {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn send_batch(&self, _messages: Vec<OutgoingMessage>) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

#[tokio::test]
async fn slow_transport_is_cut_off_by_timeout() {
    let app = TestApp::spawn().await;
    let ticket = app.open_ticket(&app.alice, "Slow", "Body").await;
    let detail = view::find_ticket(app.db(), ticket.id).await.unwrap();
    let post = tickets::add_post(
        app.db(),
        app.store(),
        app.notifier(),
        ticket.id,
        app.bob.id,
        NewPost {
            message: "Following up".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let notifier = Notifier::new(Arc::new(StalledTransport), "http://testserver", Duration::from_millis(50));
    let started = Instant::now();
    notifier.notify(app.db(), &detail, &post, Some(app.bob.id)).await;
    assert!(started.elapsed() < Duration::from_secs(5));
}
