//! A member-level deny overwrite beats the role grant it overrides (§4.3).

mod common;

use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn member_overwrite_denying_send_blocks_an_otherwise_allowed_member() {
    let server = TestServer::spawn(18831).await;

    let (owner_token, _) = server.register("lia").await;
    let created = server.create_server(&owner_token, "Lia's Place").await;
    let server_id = created["id"].as_str().unwrap();
    let channel = server.create_channel(&owner_token, server_id, "general").await;
    let channel_id = channel["id"].as_str().unwrap();

    let invite = server
        .post(&format!("/v1/servers/{server_id}/invites"), Some(&owner_token), json!({}))
        .await
        .1;
    let code = invite["code"].as_str().unwrap();
    let (member_token, member_id) = server.register("moe").await;
    let (status, _) = server.post(&format!("/v1/invites/{code}"), Some(&member_token), json!({})).await;
    assert_eq!(status, 200);

    let (status, sent) = server
        .post(
            &format!("/v1/channels/{channel_id}/messages"),
            Some(&member_token),
            json!({ "body": "before the overwrite" }),
        )
        .await;
    assert_eq!(status, 201, "{sent:?}");

    let (status, _) = server
        .put(
            &format!("/v1/channels/{channel_id}/overwrites"),
            Some(&owner_token),
            json!([{
                "target": "member",
                "target_id": member_id,
                "deny": ["send_messages"],
            }]),
        )
        .await;
    assert_eq!(status, 200);

    let (status, blocked) = server
        .post(
            &format!("/v1/channels/{channel_id}/messages"),
            Some(&member_token),
            json!({ "body": "after the overwrite" }),
        )
        .await;
    assert_eq!(status, 403, "{blocked:?}");

    let (status, still_readable) = server
        .get(&format!("/v1/channels/{channel_id}/messages"), Some(&member_token))
        .await;
    assert_eq!(status, 200, "{still_readable:?}");
    assert_eq!(still_readable["items"].as_array().unwrap().len(), 1);
}
