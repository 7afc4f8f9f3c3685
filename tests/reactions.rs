//! Adding/removing a reaction is a set-insert/set-delete, not a toggle (§4.4).

mod common;

use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn adding_then_removing_the_same_emoji_clears_it() {
    let server = TestServer::spawn(18811).await;

    let (token, _) = server.register("dee").await;
    let created = server.create_server(&token, "Dee's Place").await;
    let server_id = created["id"].as_str().unwrap();
    let channel = server.create_channel(&token, server_id, "general").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (_, message) = server
        .post(
            &format!("/v1/channels/{channel_id}/messages"),
            Some(&token),
            json!({ "body": "react to this" }),
        )
        .await;
    let message_id = message["id"].as_str().unwrap();

    let (status, reactions) = server
        .post(&format!("/v1/messages/{message_id}/reactions/%F0%9F%91%8D"), Some(&token), json!({}))
        .await;
    assert_eq!(status, 200, "{reactions:?}");
    let list = reactions.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["count"], 1);

    let (status, reactions) = server
        .delete(&format!("/v1/messages/{message_id}/reactions/%F0%9F%91%8D"), Some(&token))
        .await;
    assert_eq!(status, 200, "{reactions:?}");
    assert!(reactions.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn adding_the_same_emoji_twice_stays_at_one() {
    let server = TestServer::spawn(18813).await;

    let (token, _) = server.register("gus").await;
    let created = server.create_server(&token, "Gus's Place").await;
    let server_id = created["id"].as_str().unwrap();
    let channel = server.create_channel(&token, server_id, "general").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (_, message) = server
        .post(
            &format!("/v1/channels/{channel_id}/messages"),
            Some(&token),
            json!({ "body": "react twice" }),
        )
        .await;
    let message_id = message["id"].as_str().unwrap();

    server
        .post(&format!("/v1/messages/{message_id}/reactions/%F0%9F%91%8D"), Some(&token), json!({}))
        .await;
    let (status, reactions) = server
        .post(&format!("/v1/messages/{message_id}/reactions/%F0%9F%91%8D"), Some(&token), json!({}))
        .await;
    assert_eq!(status, 200, "{reactions:?}");
    let list = reactions.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["count"], 1);
}

#[tokio::test]
async fn two_different_users_reacting_both_count() {
    let server = TestServer::spawn(18812).await;

    let (owner_token, _) = server.register("ed").await;
    let created = server.create_server(&owner_token, "Ed's Place").await;
    let server_id = created["id"].as_str().unwrap();
    let channel = server.create_channel(&owner_token, server_id, "general").await;
    let channel_id = channel["id"].as_str().unwrap();

    let invite = server
        .post(&format!("/v1/servers/{server_id}/invites"), Some(&owner_token), json!({}))
        .await
        .1;
    let code = invite["code"].as_str().unwrap();
    let (other_token, _) = server.register("fin").await;
    server.post(&format!("/v1/invites/{code}"), Some(&other_token), json!({})).await;

    let (_, message) = server
        .post(
            &format!("/v1/channels/{channel_id}/messages"),
            Some(&owner_token),
            json!({ "body": "react please" }),
        )
        .await;
    let message_id = message["id"].as_str().unwrap();

    server.post(&format!("/v1/messages/{message_id}/reactions/%F0%9F%91%8D"), Some(&owner_token), json!({})).await;
    let (status, reactions) = server
        .post(&format!("/v1/messages/{message_id}/reactions/%F0%9F%91%8D"), Some(&other_token), json!({}))
        .await;
    assert_eq!(status, 200, "{reactions:?}");
    let list = reactions.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["count"], 2);
}
