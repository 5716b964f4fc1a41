mod common;

use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set};

use common::TestApp;
use helpdesk::entity::{status, ticket, ticket_follower, ticket_post};
use helpdesk::model::global_error::{AppError, ErrorCode};
use helpdesk::model::ticket::TicketListQuery;
use helpdesk::sentiment::Sentiment;
use helpdesk::service::query::{self, SortField, SortOrder};
use helpdesk::service::{
    lookup, ticket as tickets, view, FollowAction, NewPost, NewTicket, TicketChanges, TicketFilter, TicketScope,
    TicketSort,
};

fn post(message: &str) -> NewPost {
    NewPost {
        message: message.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn new_ticket_is_open_and_unassigned() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Printer jam", "Paper stuck in tray 2").await;

    let open = lookup::open_status(app.db()).await.unwrap();
    assert_eq!(created.status_id, Some(open.id));
    assert_eq!(created.created_by, Some(app.alice.id));
    assert_eq!(created.assigned_to, None);
    assert_eq!(created.priority, ticket::Priority::High);

    let posts = created.find_related(ticket_post::Entity).all(app.db()).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].user_id, Some(app.alice.id));
}

#[tokio::test]
async fn only_the_first_post_sets_sentiment() {
    let app = TestApp::spawn().await;
    let created = app
        .open_ticket(&app.alice, "Laptop", "I love the new laptop, great work and thanks!")
        .await;
    assert_eq!(created.sentiment, Some(Sentiment::Positive));

    tickets::add_post(
        app.db(),
        app.store(),
        app.notifier(),
        created.id,
        app.bob.id,
        post("This is terrible, awful and broken."),
    )
    .await
    .unwrap();

    let reloaded = view::find_ticket(app.db(), created.id).await.unwrap();
    assert_eq!(reloaded.sentiment, Some(Sentiment::Positive));
}

#[tokio::test]
async fn invalid_input_creates_nothing() {
    let app = TestApp::spawn().await;
    let result = tickets::create_ticket(
        app.db(),
        app.store(),
        app.alice.id,
        NewTicket {
            title: "  ".to_string(),
            priority: Some(7),
            ..Default::default()
        },
        post(""),
    )
    .await;

    match result {
        Err(AppError::ValidationError(errors)) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["title", "priority", "message"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ticket::Entity::find().count(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_open_status_fails_creation() {
    let app = TestApp::spawn().await;
    status::Entity::delete_many()
        .filter(status::Column::Label.eq(status::OPEN))
        .exec(app.db())
        .await
        .unwrap();

    let result = tickets::create_ticket(
        app.db(),
        app.store(),
        app.alice.id,
        NewTicket {
            title: "VPN down".to_string(),
            ..Default::default()
        },
        post("Cannot connect"),
    )
    .await;

    assert_eq!(result.unwrap_err().code(), ErrorCode::OpenStatusMissing);
    assert_eq!(ticket::Entity::find().count(app.db()).await.unwrap(), 0);
    assert_eq!(ticket_post::Entity::find().count(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn toggling_follow_twice_restores_state() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Email", "Outlook keeps crashing").await;

    let first = tickets::toggle_follow(app.db(), created.id, app.bob.id).await.unwrap();
    assert_eq!(first, FollowAction::Followed);
    assert!(tickets::is_following(app.db(), created.id, app.bob.id).await.unwrap());

    let second = tickets::toggle_follow(app.db(), created.id, app.bob.id).await.unwrap();
    assert_eq!(second, FollowAction::Unfollowed);
    assert!(!tickets::is_following(app.db(), created.id, app.bob.id).await.unwrap());
}

#[tokio::test]
async fn assigning_unknown_user_leaves_ticket_unchanged() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Monitor", "Flickering screen").await;
    tickets::assign_to_user(app.db(), created.id, app.bob.id).await.unwrap();

    let err = tickets::assign_to_user(app.db(), created.id, 9999).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemberNotFound);

    let reloaded = view::find_ticket(app.db(), created.id).await.unwrap();
    assert_eq!(reloaded.assigned_to, Some(app.bob.id));
}

#[tokio::test]
async fn status_and_department_changes_use_reference_rows() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Keyboard", "Missing keys").await;

    let resolved = lookup::list_statuses(app.db())
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.label == "Resolved")
        .unwrap();
    let (updated, changed_to) = tickets::change_status(app.db(), created.id, resolved.id).await.unwrap();
    assert_eq!(updated.status_id, Some(resolved.id));
    assert_eq!(changed_to.label, "Resolved");

    let err = tickets::change_status(app.db(), created.id, 9999).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::StatusNotFound);

    let err = tickets::transfer_department(app.db(), 9999, 1).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::TicketNotFound);
}

#[tokio::test]
async fn deleting_a_ticket_removes_posts_and_followers() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Phone", "No dial tone").await;
    tickets::add_post(app.db(), app.store(), app.notifier(), created.id, app.bob.id, post("Checking"))
        .await
        .unwrap();
    tickets::toggle_follow(app.db(), created.id, app.carol.id).await.unwrap();

    tickets::delete_ticket(app.db(), app.store(), created.id).await.unwrap();

    assert!(view::find_ticket(app.db(), created.id).await.unwrap_err().is_not_found());
    let posts = ticket_post::Entity::find()
        .filter(ticket_post::Column::TicketId.eq(created.id))
        .count(app.db())
        .await
        .unwrap();
    let followers = ticket_follower::Entity::find()
        .filter(ticket_follower::Column::TicketId.eq(created.id))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!((posts, followers), (0, 0));
}

#[tokio::test]
async fn updating_fields_validates_lookups() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Old title", "Body").await;

    let updated = tickets::update_ticket(
        app.db(),
        created.id,
        TicketChanges {
            title: Some("New title".to_string()),
            priority: Some(3),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.priority, ticket::Priority::Low);

    let err = tickets::update_ticket(
        app.db(),
        created.id,
        TicketChanges {
            department: Some(9999),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DepartmentNotFound);
}

#[tokio::test]
async fn pages_hold_ten_tickets_and_clamp() {
    let app = TestApp::spawn().await;
    for n in 0..25 {
        app.open_ticket(&app.alice, &format!("Ticket {n}"), "Body").await;
    }

    let filter = TicketFilter::default();
    let sort = TicketSort::default();
    let sizes = [("1", 10, 1), ("2", 10, 2), ("3", 5, 3), ("4", 5, 3), ("abc", 10, 1)];
    for (raw, len, page) in sizes {
        let result = query::search_tickets(app.db(), TicketScope::All, &filter, sort, Some(raw))
            .await
            .unwrap();
        assert_eq!(result.content.len(), len, "page {raw}");
        assert_eq!(result.page, page, "page {raw}");
        assert_eq!(result.total_elements, 25);
        assert_eq!(result.total_pages, 3);
    }
}

#[tokio::test]
async fn title_filter_is_case_insensitive_substring() {
    let app = TestApp::spawn().await;
    app.open_ticket(&app.alice, "Printer jam", "Body").await;
    app.open_ticket(&app.alice, "Email down", "Body").await;
    app.open_ticket(&app.alice, "Office PRINTER offline", "Body").await;

    let filter = TicketFilter::from_query(&TicketListQuery {
        title: Some("printer".to_string()),
        ..Default::default()
    });
    let result = query::search_tickets(app.db(), TicketScope::All, &filter, TicketSort::default(), None)
        .await
        .unwrap();

    assert_eq!(result.total_elements, 2);
    assert!(result.content.iter().all(|t| t.title.to_lowercase().contains("printer")));
}

#[tokio::test]
async fn sorting_by_title_and_scoping_by_follower() {
    let app = TestApp::spawn().await;
    let b = app.open_ticket(&app.alice, "Bravo", "Body").await;
    let a = app.open_ticket(&app.bob, "Alpha", "Body").await;
    let c = app.open_ticket(&app.alice, "Charlie", "Body").await;
    tickets::toggle_follow(app.db(), a.id, app.carol.id).await.unwrap();
    tickets::toggle_follow(app.db(), c.id, app.carol.id).await.unwrap();

    let sort = TicketSort::parse(Some("-title"), None);
    assert_eq!((sort.field, sort.order), (SortField::Title, SortOrder::Desc));
    let result = query::search_tickets(app.db(), TicketScope::All, &TicketFilter::default(), sort, None)
        .await
        .unwrap();
    let ids: Vec<_> = result.content.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);

    let followed = query::search_tickets(
        app.db(),
        TicketScope::FollowedBy(app.carol.id),
        &TicketFilter::default(),
        TicketSort::parse(Some("title"), None),
        None,
    )
    .await
    .unwrap();
    let ids: Vec<_> = followed.content.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![a.id, c.id]);

    assert_eq!(query::count_tickets(app.db(), TicketScope::CreatedBy(app.alice.id)).await.unwrap(), 2);
}

#[tokio::test]
async fn sorting_by_status_joins_reference_table() {
    let app = TestApp::spawn().await;
    let first = app.open_ticket(&app.alice, "One", "Body").await;
    let second = app.open_ticket(&app.alice, "Two", "Body").await;

    let closed = lookup::list_statuses(app.db())
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.label == "Closed")
        .unwrap();
    tickets::change_status(app.db(), second.id, closed.id).await.unwrap();

    let result = query::search_tickets(
        app.db(),
        TicketScope::All,
        &TicketFilter::default(),
        TicketSort::parse(Some("status__status"), Some("asc")),
        None,
    )
    .await
    .unwrap();
    let ids: Vec<_> = result.content.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn detail_lists_posts_in_conversation_order() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Access", "Need VPN access").await;
    tickets::add_post(app.db(), app.store(), app.notifier(), created.id, app.bob.id, post("Granted"))
        .await
        .unwrap();
    tickets::toggle_follow(app.db(), created.id, app.bob.id).await.unwrap();

    let detail = view::ticket_detail(app.db(), app.store(), created.id).await.unwrap();
    let messages: Vec<_> = detail.posts.iter().map(|p| p.message.as_str()).collect();
    assert_eq!(messages, vec!["Need VPN access", "Granted"]);
    assert_eq!(detail.followers.len(), 1);
    assert_eq!(detail.followers[0].username, "bob");
    assert_eq!(detail.ticket.status.as_ref().map(|s| s.status.as_str()), Some("Open"));
}

#[tokio::test]
async fn deleting_a_post_keeps_the_ticket() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Chair", "Broken wheel").await;
    let reply = tickets::add_post(app.db(), app.store(), app.notifier(), created.id, app.bob.id, post("Ordered"))
        .await
        .unwrap();

    let ticket_id = tickets::delete_post(app.db(), app.store(), reply.id).await.unwrap();
    assert_eq!(ticket_id, created.id);
    assert!(view::find_post(app.db(), reply.id).await.unwrap_err().is_not_found());
    assert!(view::find_ticket(app.db(), created.id).await.is_ok());
}

#[tokio::test]
async fn reposting_after_deleting_the_only_post_keeps_sentiment() {
    let app = TestApp::spawn().await;
    let created = app
        .open_ticket(&app.alice, "Laptop", "I love the new laptop, great work!")
        .await;
    assert_eq!(created.sentiment, Some(Sentiment::Positive));

    let only = created.find_related(ticket_post::Entity).one(app.db()).await.unwrap().unwrap();
    tickets::delete_post(app.db(), app.store(), only.id).await.unwrap();

    tickets::add_post(
        app.db(),
        app.store(),
        app.notifier(),
        created.id,
        app.alice.id,
        post("This is terrible and broken"),
    )
    .await
    .unwrap();

    let reloaded = view::find_ticket(app.db(), created.id).await.unwrap();
    assert_eq!(reloaded.sentiment, Some(Sentiment::Positive));
}

#[tokio::test]
async fn concurrent_follows_by_different_users_are_all_kept() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Wifi", "Signal drops every hour").await;

    let (alice, bob, carol) = tokio::join!(
        tickets::toggle_follow(app.db(), created.id, app.alice.id),
        tickets::toggle_follow(app.db(), created.id, app.bob.id),
        tickets::toggle_follow(app.db(), created.id, app.carol.id),
    );
    assert_eq!(alice.unwrap(), FollowAction::Followed);
    assert_eq!(bob.unwrap(), FollowAction::Followed);
    assert_eq!(carol.unwrap(), FollowAction::Followed);

    let followers = ticket_follower::Entity::find()
        .filter(ticket_follower::Column::TicketId.eq(created.id))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(followers, 3);
    for user in [&app.alice, &app.bob, &app.carol] {
        assert!(tickets::is_following(app.db(), created.id, user.id).await.unwrap());
    }
}

#[tokio::test]
async fn concurrent_first_posts_record_sentiment_once() {
    let app = TestApp::spawn().await;
    let created = app.open_ticket(&app.alice, "Projector", "Bulb is out").await;

    // 감성 저장이 실패한 채로 게시글이 모두 지워진 티켓
    let only = created.find_related(ticket_post::Entity).one(app.db()).await.unwrap().unwrap();
    tickets::delete_post(app.db(), app.store(), only.id).await.unwrap();
    let mut cleared: ticket::ActiveModel = view::find_ticket(app.db(), created.id).await.unwrap().into();
    cleared.sentiment = Set(None);
    cleared.update(app.db()).await.unwrap();

    let (happy, angry) = tokio::join!(
        tickets::add_post(
            app.db(),
            app.store(),
            app.notifier(),
            created.id,
            app.bob.id,
            post("Thanks, this is great and works perfectly!"),
        ),
        tickets::add_post(
            app.db(),
            app.store(),
            app.notifier(),
            created.id,
            app.carol.id,
            post("This is terrible, awful and broken."),
        ),
    );
    let (happy, angry) = (happy.unwrap(), angry.unwrap());

    let first = if happy.id < angry.id { Sentiment::Positive } else { Sentiment::Negative };
    let reloaded = view::find_ticket(app.db(), created.id).await.unwrap();
    assert_eq!(reloaded.sentiment, Some(first));

    let posts = ticket_post::Entity::find()
        .filter(ticket_post::Column::TicketId.eq(created.id))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(posts, 2);
}
