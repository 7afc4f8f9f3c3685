//! Create, edit, delete and list a channel message end to end.

mod common;

use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn create_edit_delete_round_trip() {
    let server = TestServer::spawn(18801).await;

    let (token, _user_id) = server.register("alice").await;
    let created = server.create_server(&token, "Alice's Place").await;
    let server_id = created["id"].as_str().unwrap();
    let channel = server.create_channel(&token, server_id, "general").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, message) = server
        .post(
            &format!("/v1/channels/{channel_id}/messages"),
            Some(&token),
            json!({ "body": "hello there" }),
        )
        .await;
    assert_eq!(status, 201, "{message:?}");
    assert_eq!(message["body"], "hello there");
    assert!(message["updated_at"].is_null());
    let message_id = message["id"].as_str().unwrap().to_string();

    let (status, listed) = server
        .get(&format!("/v1/channels/{channel_id}/messages"), Some(&token))
        .await;
    assert_eq!(status, 200, "{listed:?}");
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);

    let (status, edited) = server
        .patch(
            &format!("/v1/messages/{message_id}"),
            Some(&token),
            json!({ "body": "hello there, edited" }),
        )
        .await;
    assert_eq!(status, 200, "{edited:?}");
    assert_eq!(edited["body"], "hello there, edited");
    assert!(!edited["updated_at"].is_null());

    let (status, deleted) = server
        .delete(&format!("/v1/messages/{message_id}"), Some(&token))
        .await;
    assert_eq!(status, 200, "{deleted:?}");
    assert_eq!(deleted["id"], message_id);
    assert_eq!(deleted["channel_id"], channel_id);

    let (status, listed) = server
        .get(&format!("/v1/channels/{channel_id}/messages"), Some(&token))
        .await;
    assert_eq!(status, 200, "{listed:?}");
    assert!(listed["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn editing_someone_elses_message_is_forbidden() {
    let server = TestServer::spawn(18802).await;

    let (owner_token, _) = server.register("bea").await;
    let created = server.create_server(&owner_token, "Bea's Place").await;
    let server_id = created["id"].as_str().unwrap();
    let channel = server.create_channel(&owner_token, server_id, "general").await;
    let channel_id = channel["id"].as_str().unwrap();
    let invite = server
        .post(
            &format!("/v1/servers/{server_id}/invites"),
            Some(&owner_token),
            json!({}),
        )
        .await
        .1;
    let code = invite["code"].as_str().unwrap();

    let (other_token, _) = server.register("cass").await;
    let (status, _) = server.post(&format!("/v1/invites/{code}"), Some(&other_token), json!({})).await;
    assert_eq!(status, 200);

    let (_, message) = server
        .post(
            &format!("/v1/channels/{channel_id}/messages"),
            Some(&owner_token),
            json!({ "body": "only I can edit this" }),
        )
        .await;
    let message_id = message["id"].as_str().unwrap();

    let (status, body) = server
        .patch(
            &format!("/v1/messages/{message_id}"),
            Some(&other_token),
            json!({ "body": "nope" }),
        )
        .await;
    assert_eq!(status, 403, "{body:?}");
}
