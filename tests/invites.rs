//! Single-use invites (§4.2) stop admitting members once exhausted.

mod common;

use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn an_invite_capped_at_one_use_rejects_the_second_joiner() {
    let server = TestServer::spawn(18841).await;

    let (owner_token, _) = server.register("nia").await;
    let created = server.create_server(&owner_token, "Nia's Place").await;
    let server_id = created["id"].as_str().unwrap();

    let (status, invite) = server
        .post(
            &format!("/v1/servers/{server_id}/invites"),
            Some(&owner_token),
            json!({ "max_uses": 1 }),
        )
        .await;
    assert_eq!(status, 201, "{invite:?}");
    let code = invite["code"].as_str().unwrap();

    let (first_token, _) = server.register("oto").await;
    let (status, joined) = server.post(&format!("/v1/invites/{code}"), Some(&first_token), json!({})).await;
    assert_eq!(status, 200, "{joined:?}");
    assert_eq!(joined["id"], server_id);

    let (second_token, _) = server.register("pat").await;
    let (status, rejected) = server.post(&format!("/v1/invites/{code}"), Some(&second_token), json!({})).await;
    assert_eq!(status, 404, "{rejected:?}");

    let (status, members) = server
        .get(&format!("/v1/servers/{server_id}/members"), Some(&owner_token))
        .await;
    assert_eq!(status, 200, "{members:?}");
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rejoining_with_an_already_used_invite_is_a_no_op_not_a_second_use() {
    let server = TestServer::spawn(18842).await;

    let (owner_token, _) = server.register("quin").await;
    let created = server.create_server(&owner_token, "Quin's Place").await;
    let server_id = created["id"].as_str().unwrap();

    let (_, invite) = server
        .post(
            &format!("/v1/servers/{server_id}/invites"),
            Some(&owner_token),
            json!({ "max_uses": 2 }),
        )
        .await;
    let code = invite["code"].as_str().unwrap();

    let (member_token, _) = server.register("rex").await;
    server.post(&format!("/v1/invites/{code}"), Some(&member_token), json!({})).await;
    let (status, rejoin) = server.post(&format!("/v1/invites/{code}"), Some(&member_token), json!({})).await;
    assert_eq!(status, 200, "{rejoin:?}");

    let (second_token, _) = server.register("sam").await;
    let (status, second_join) = server.post(&format!("/v1/invites/{code}"), Some(&second_token), json!({})).await;
    assert_eq!(status, 200, "{second_join:?}");
}
