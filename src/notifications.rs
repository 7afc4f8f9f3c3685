//! Best-effort push notification enqueuer (C10, §4.10).
//!
//! Synthesizes one notification record per recipient on message create and
//! hands it to the configured push transport. Failures are logged and
//! swallowed — per §7's propagation policy, this path never fails the
//! request that triggered it.

use crate::models::{Channel, DirectThread, Message, PushSubscription};

const BODY_PREVIEW_LEN: usize = 140;

#[derive(Debug, Clone)]
pub struct Notification {
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    pub url: String,
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= BODY_PREVIEW_LEN {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(BODY_PREVIEW_LEN).collect();
    truncated.push('…');
    truncated
}

/// Build the notification set for a channel message: recipients are every
/// member who can read the channel, minus the author.
pub fn for_channel_message(
    message: &Message,
    channel: &Channel,
    server_name: &str,
    readable_member_ids: &[String],
) -> Vec<Notification> {
    let title = format!("#{} ({})", channel.name, server_name);
    let body = truncate_body(&message.body);
    let url = format!("/servers/{}/channels/{}/messages/{}", channel.server_id, channel.id, message.id);

    readable_member_ids
        .iter()
        .filter(|id| **id != message.author_id)
        .map(|id| Notification {
            recipient_id: id.clone(),
            title: title.clone(),
            body: body.clone(),
            url: url.clone(),
        })
        .collect()
}

/// Build the notification set for a direct-thread message: recipients are
/// every other participant.
pub fn for_direct_message(message: &Message, thread: &DirectThread) -> Vec<Notification> {
    let title = thread
        .title
        .clone()
        .unwrap_or_else(|| "New direct message".to_string());
    let body = truncate_body(&message.body);
    let url = format!("/direct-threads/{}/messages/{}", thread.id, message.id);

    thread
        .participant_ids
        .iter()
        .filter(|id| **id != message.author_id)
        .map(|id| Notification {
            recipient_id: id.clone(),
            title: title.clone(),
            body: body.clone(),
            url: url.clone(),
        })
        .collect()
}

/// Deliver notifications to every push subscription on record for their
/// recipient. In this deployment that means logging the payload — wiring a
/// real Web Push transport is left to the operator's push gateway of choice.
pub async fn enqueue(notifications: Vec<Notification>, subscriptions_by_user: impl Fn(&str) -> Vec<PushSubscription>) {
    for notification in notifications {
        let subs = subscriptions_by_user(&notification.recipient_id);
        if subs.is_empty() {
            continue;
        }
        tracing::debug!(
            recipient = %notification.recipient_id,
            subscriptions = subs.len(),
            title = %notification.title,
            "enqueued push notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_truncated_with_ellipsis() {
        let body = "a".repeat(200);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), BODY_PREVIEW_LEN + 1);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn author_is_excluded_from_channel_recipients() {
        let message = Message {
            id: "msg_1".into(),
            channel_id: "chn_1".into(),
            conversation_id: "chn_1".into(),
            direct_thread_id: None,
            author_id: "usr_1".into(),
            body: "hello".into(),
            attachments: vec![],
            created_at: crate::ids::now(),
            updated_at: None,
            reactions: vec![],
        };
        let channel = Channel {
            id: "chn_1".into(),
            server_id: "srv_1".into(),
            name: "general".into(),
            channel_type: crate::models::ChannelType::Text,
            created_at: crate::ids::now(),
        };
        let notifications = for_channel_message(
            &message,
            &channel,
            "My Server",
            &["usr_1".to_string(), "usr_2".to_string()],
        );
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].recipient_id, "usr_2");
    }
}
