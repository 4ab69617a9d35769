// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the full HTTP stack.
//!
//! Every test builds a `TestHarness` (temp SQLite, two seeded tenants) and
//! drives the router in-process.

use std::sync::Arc;
use std::time::Duration;

use livia_core::{
    ConversationRepository, ConversationStatus, LifecycleAction, SenderRole, TagAutomation,
};
use livia_inbox::{InboxView, SubscriptionStatus};
use livia_test_utils::{Method, StatusCode, TestHarness};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn harness() -> TestHarness {
    TestHarness::builder().build().await.unwrap()
}

// --- Auth and tenant isolation ---

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let h = harness().await;
    let (status, body) = h
        .request(Method::GET, "/api/conversations", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Não autorizado");
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let h = harness().await;
    let (status, _) = h.get("/api/conversations", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pausing_another_tenants_conversation_is_forbidden_and_changes_nothing() {
    let h = harness().await;
    let theirs = h
        .seed_conversation(&h.tenant_b, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/pause-ia",
            &h.tenant_a.token,
            json!({ "conversation_id": theirs }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Acesso negado");

    let stored = h.conversation(&h.tenant_b, &theirs).await.unwrap();
    assert_eq!(stored.status, ConversationStatus::Open);
    assert!(stored.ai_active);
}

#[tokio::test]
async fn client_supplied_foreign_tenant_id_is_forbidden() {
    let h = harness().await;
    let mine = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, _) = h
        .post(
            "/api/conversations/pause-ia",
            &h.tenant_a.token,
            json!({ "conversation_id": mine, "tenant_id": h.tenant_b.tenant_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let stored = h.conversation(&h.tenant_a, &mine).await.unwrap();
    assert_eq!(stored.status, ConversationStatus::Open);
}

#[tokio::test]
async fn listing_returns_only_own_conversations() {
    let h = harness().await;
    let mine = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();
    h.seed_conversation(&h.tenant_b, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h.get("/api/conversations", &h.tenant_a.token).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["conversations"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(mine));
    assert_eq!(rows[0]["contact"]["id"], json!(h.tenant_a.contact_id));
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let h = harness().await;
    let (status, _) = h
        .post(
            "/api/conversations/close",
            &h.tenant_a.token,
            json!({ "conversation_id": "missing" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_a_json_bad_request() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h
        .post("/api/conversations/pause-ia", &h.tenant_a.token, json!({ "wrong": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Requisição inválida"));

    let (status, body) = h
        .post(
            "/api/tags/apply",
            &h.tenant_a.token,
            json!({ "conversation_id": id, "tag_id": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let stored = h.conversation(&h.tenant_a, &id).await.unwrap();
    assert_eq!(stored.status, ConversationStatus::Open);
}

// --- Lifecycle ---

#[tokio::test]
async fn pause_then_resume_round_trip() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/pause-ia",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["conversation"]["status"], "paused");
    assert_eq!(body["conversation"]["ai_active"], false);

    let (status, body) = h
        .post(
            "/api/conversations/resume-ia",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation"]["status"], "open");
    assert_eq!(body["conversation"]["ai_active"], true);
}

#[tokio::test]
async fn pausing_an_already_paused_conversation_is_rejected() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Paused)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/pause-ia",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Conversa já está pausada");
    let stored = h.conversation(&h.tenant_a, &id).await.unwrap();
    assert_eq!(stored.status, ConversationStatus::Paused);
    assert!(!stored.ai_active);
}

#[tokio::test]
async fn reopening_an_open_conversation_is_rejected() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/reopen",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Apenas conversas encerradas podem ser reabertas"
    );
    let stored = h.conversation(&h.tenant_a, &id).await.unwrap();
    assert_eq!(stored.status, ConversationStatus::Open);
    assert!(stored.ai_active);
}

#[tokio::test]
async fn close_then_reopen() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Paused)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/close",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation"]["status"], "closed");

    let (status, body) = h
        .post(
            "/api/conversations/close",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Conversa já está encerrada");

    let (status, body) = h
        .post(
            "/api/conversations/reopen",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation"]["status"], "open");
    assert_eq!(body["conversation"]["ai_active"], true);
}

#[tokio::test]
async fn status_change_is_relayed_to_workflow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({
            "event": "conversation.status_changed",
            "action": "pause_ai",
            "to": "paused",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let h = TestHarness::builder()
        .with_webhook(format!("{}/hook", server.uri()), Duration::from_secs(2))
        .build()
        .await
        .unwrap();
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/pause-ia",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("warning").is_none());
}

#[tokio::test]
async fn failing_workflow_is_a_soft_warning() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let h = TestHarness::builder()
        .with_webhook(server.uri(), Duration::from_secs(2))
        .build()
        .await
        .unwrap();
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/pause-ia",
            &h.tenant_a.token,
            json!({ "conversation_id": id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["warning"].is_string());
    // The transition committed regardless.
    let stored = h.conversation(&h.tenant_a, &id).await.unwrap();
    assert_eq!(stored.status, ConversationStatus::Paused);
}

// --- Messages ---

#[tokio::test]
async fn send_message_appends_and_lists_oldest_first() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Paused)
        .await
        .unwrap();

    for text in ["Olá!", "Como posso ajudar?"] {
        let (status, body) = h
            .post(
                "/api/conversations/send-message",
                &h.tenant_a.token,
                json!({ "conversation_id": id, "body": text }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"]["sender"], "agent");
    }

    let (status, body) = h
        .get(
            &format!("/api/conversations/{id}/messages"),
            &h.tenant_a.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let bodies: Vec<_> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(bodies, ["Olá!", "Como posso ajudar?"]);
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/send-message",
            &h.tenant_a.token,
            json!({ "conversation_id": id, "body": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Mensagem não pode ser vazia");
}

#[tokio::test]
async fn closed_conversation_does_not_accept_messages() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Closed)
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/conversations/send-message",
            &h.tenant_a.token,
            json!({ "conversation_id": id, "body": "oi" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Conversa encerrada não aceita mensagens");
}

#[tokio::test]
async fn reading_another_tenants_thread_is_forbidden() {
    let h = harness().await;
    let theirs = h
        .seed_conversation(&h.tenant_b, ConversationStatus::Open)
        .await
        .unwrap();

    let (status, _) = h
        .get(
            &format!("/api/conversations/{theirs}/messages"),
            &h.tenant_a.token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mark_read_clears_unread() {
    let h = harness().await;
    let record = h
        .storage
        .record_inbound_message(
            &h.tenant_a.tenant_id,
            &h.tenant_a.contact_id,
            SenderRole::Contact,
            "preciso de ajuda",
        )
        .await
        .unwrap();
    assert!(record.conversation.has_unread);

    let (status, body) = h
        .post(
            "/api/conversations/mark-read",
            &h.tenant_a.token,
            json!({ "conversation_id": record.conversation.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation"]["unread_count"], 0);
    assert_eq!(body["conversation"]["has_unread"], false);
}

// --- Tags and kanban ---

#[tokio::test]
async fn tag_automation_pauses_and_sends_auto_reply_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "event": "tag.auto_reply" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "event": "conversation.status_changed" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let h = TestHarness::builder()
        .with_webhook(server.uri(), Duration::from_secs(2))
        .build()
        .await
        .unwrap();
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();
    let tag = h
        .seed_tag(
            &h.tenant_a,
            "Humano",
            false,
            TagAutomation {
                action: Some(LifecycleAction::PauseAi),
                auto_reply: Some("Um atendente vai falar com você.".to_string()),
            },
        )
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/tags/apply",
            &h.tenant_a.token,
            json!({ "conversation_id": id, "tag_id": tag }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["conversation"]["status"], "paused");

    // Applying again is idempotent and runs no automation.
    let (status, body) = h
        .post(
            "/api/tags/apply",
            &h.tenant_a.token,
            json!({ "conversation_id": id, "tag_id": tag }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert!(body.get("conversation").is_none());
}

#[tokio::test]
async fn rejected_tag_transition_is_skipped_not_failed() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();
    let tag = h
        .seed_tag(
            &h.tenant_a,
            "Reabrir",
            false,
            TagAutomation {
                action: Some(LifecycleAction::Reopen),
                auto_reply: None,
            },
        )
        .await
        .unwrap();

    let (status, body) = h
        .post(
            "/api/tags/apply",
            &h.tenant_a.token,
            json!({ "conversation_id": id, "tag_id": tag }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    let stored = h.conversation(&h.tenant_a, &id).await.unwrap();
    assert_eq!(stored.status, ConversationStatus::Open);
}

#[tokio::test]
async fn applying_another_tenants_tag_is_forbidden() {
    let h = harness().await;
    let id = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();
    let foreign_tag = h
        .seed_tag(&h.tenant_b, "Vendas", true, TagAutomation::default())
        .await
        .unwrap();

    let (status, _) = h
        .post(
            "/api/tags/apply",
            &h.tenant_a.token,
            json!({ "conversation_id": id, "tag_id": foreign_tag }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn kanban_groups_by_category_tag() {
    let h = harness().await;
    let tagged = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();
    let untagged = h
        .seed_conversation(&h.tenant_a, ConversationStatus::Open)
        .await
        .unwrap();
    let category = h
        .seed_tag(&h.tenant_a, "Suporte", true, TagAutomation::default())
        .await
        .unwrap();
    h.post(
        "/api/tags/apply",
        &h.tenant_a.token,
        json!({ "conversation_id": tagged, "tag_id": category }),
    )
    .await;

    let (status, body) = h.get("/api/kanban", &h.tenant_a.token).await;
    assert_eq!(status, StatusCode::OK);
    let columns = body["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0]["key"], json!(category));
    assert_eq!(columns[0]["conversations"][0]["id"], json!(tagged));
    assert_eq!(columns[1]["key"], "uncategorized");
    assert_eq!(columns[1]["conversations"][0]["id"], json!(untagged));

    let (_, body) = h.get("/api/tags", &h.tenant_a.token).await;
    assert_eq!(body["tags"].as_array().unwrap().len(), 1);
}

// --- Wallet ---

#[tokio::test]
async fn wallet_balance_matches_entries() {
    let h = harness().await;
    let tenant = &h.tenant_a.tenant_id;
    h.ledger.credit(tenant, 1_000, "recarga").await.unwrap();
    h.ledger.debit(tenant, 250, "mensagens").await.unwrap();
    h.ledger
        .credit(&h.tenant_b.tenant_id, 99, "outro tenant")
        .await
        .unwrap();

    let (status, body) = h.get("/api/wallet", &h.tenant_a.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 750);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn overdraft_leaves_the_ledger_untouched() {
    let h = harness().await;
    let tenant = &h.tenant_a.tenant_id;
    h.ledger.credit(tenant, 100, "recarga").await.unwrap();
    assert!(h.ledger.debit(tenant, 101, "grande").await.is_err());

    let (_, body) = h.get("/api/wallet", &h.tenant_a.token).await;
    assert_eq!(body["balance"], 100);
    assert!(h.ledger.verify_invariant(tenant).await.unwrap().is_consistent());
}

// --- Realtime inbox ---

#[tokio::test]
async fn inbox_view_sees_own_inbound_messages_only() {
    let h = harness().await;
    let repository: Arc<dyn ConversationRepository> = h.storage.clone();
    let mut view = InboxView::new(repository, h.bus.clone(), 64);
    view.mount(h.tenant_a.tenant_id.clone()).await.unwrap();
    assert_eq!(view.status(), SubscriptionStatus::Live);
    assert!(view.snapshot().is_empty());

    let mut list = view.watch_list();
    h.storage
        .record_inbound_message(
            &h.tenant_b.tenant_id,
            &h.tenant_b.contact_id,
            SenderRole::Contact,
            "não é seu",
        )
        .await
        .unwrap();
    let record = h
        .storage
        .record_inbound_message(
            &h.tenant_a.tenant_id,
            &h.tenant_a.contact_id,
            SenderRole::Contact,
            "olá",
        )
        .await
        .unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        list.wait_for(|rows| rows.contains(&record.conversation.id)),
    )
    .await
    .expect("inbox update in time")
    .unwrap();

    let snapshot = view.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.as_slice()[0].contact.id,
        h.tenant_a.contact_id
    );

    view.unmount().await;
    assert_eq!(view.status(), SubscriptionStatus::Idle);
}
