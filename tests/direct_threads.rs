//! Direct-message threads are unique per participant pair (§4.5, §9).

mod common;

use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn creating_a_dm_twice_returns_the_existing_thread() {
    let server = TestServer::spawn(18821).await;

    let (token_a, _) = server.register("gia").await;
    let (_token_b, user_b) = server.register("hal").await;

    let (status, first) = server
        .post("/v1/direct-threads", Some(&token_a), json!({ "participant_ids": [user_b] }))
        .await;
    assert_eq!(status, 201, "{first:?}");
    let thread_id = first["id"].as_str().unwrap().to_string();

    let (status, second) = server
        .post("/v1/direct-threads", Some(&token_a), json!({ "participant_ids": [user_b] }))
        .await;
    assert_eq!(status, 200, "{second:?}");
    assert_eq!(second["id"], thread_id);

    let (status, list) = server.get("/v1/direct-threads", Some(&token_a)).await;
    assert_eq!(status, 200, "{list:?}");
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn leaving_as_last_participant_garbage_collects_the_thread() {
    let server = TestServer::spawn(18823).await;

    let (token_a, _) = server.register("lex").await;
    let (token_b, user_b) = server.register("mia").await;

    let (_, thread) = server
        .post("/v1/direct-threads", Some(&token_a), json!({ "participant_ids": [user_b] }))
        .await;
    let thread_id = thread["id"].as_str().unwrap().to_string();

    let (status, _) = server
        .delete(&format!("/v1/direct-threads/{thread_id}/participants/@me"), Some(&token_a))
        .await;
    assert_eq!(status, 204);
    let (status, _) = server
        .delete(&format!("/v1/direct-threads/{thread_id}/participants/@me"), Some(&token_b))
        .await;
    assert_eq!(status, 204);

    let (status, body) = server.get(&format!("/v1/direct-threads/{thread_id}"), Some(&token_a)).await;
    assert_eq!(status, 404, "{body:?}");

    let (status, list) = server.get("/v1/direct-threads", Some(&token_a)).await;
    assert_eq!(status, 200, "{list:?}");
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn a_group_thread_with_three_participants_is_not_deduplicated_as_a_dm() {
    let server = TestServer::spawn(18822).await;

    let (token_a, _) = server.register("ivy").await;
    let (_token_b, user_b) = server.register("jon").await;
    let (_token_c, user_c) = server.register("kim").await;

    let (status, group) = server
        .post(
            "/v1/direct-threads",
            Some(&token_a),
            json!({ "participant_ids": [user_b, user_c], "title": "trio" }),
        )
        .await;
    assert_eq!(status, 201, "{group:?}");
    assert_eq!(group["kind"], "group");

    let (status, dm) = server
        .post("/v1/direct-threads", Some(&token_a), json!({ "participant_ids": [user_b] }))
        .await;
    assert_eq!(status, 201, "{dm:?}");
    assert_ne!(dm["id"], group["id"]);
    assert_eq!(dm["kind"], "dm");
}
