//! Permission kernel (C2) — resolves a capability grant from server roles and
//! channel overwrites. Generalizes the teacher's `Permissions` bitflag
//! (`models.rs`) from a single global mask into the role + overwrite
//! resolution algorithm of spec §4.1.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Member, Overwrite, OverwriteTarget, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageServer,
    ManageChannels,
    ReadMessages,
    SendMessages,
    KickMembers,
    BanMembers,
    ManageMessages,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::ManageServer,
        Capability::ManageChannels,
        Capability::ReadMessages,
        Capability::SendMessages,
        Capability::KickMembers,
        Capability::BanMembers,
        Capability::ManageMessages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageServer => "manage_server",
            Capability::ManageChannels => "manage_channels",
            Capability::ReadMessages => "read_messages",
            Capability::SendMessages => "send_messages",
            Capability::KickMembers => "kick_members",
            Capability::BanMembers => "ban_members",
            Capability::ManageMessages => "manage_messages",
        }
    }

    pub fn parse(s: &str) -> Option<Capability> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input bundle for a single permission decision, per spec §4.1.
pub struct PermissionContext<'a> {
    pub server_owner_id: &'a str,
    pub user_id: &'a str,
    pub roles: &'a [Role],
    pub member: &'a Member,
    pub overwrites: &'a [Overwrite],
    pub is_banned: bool,
    pub is_timed_out: bool,
    pub include_channel_overwrites: bool,
}

/// Evaluate whether `capability` is granted under `ctx`. Implements §4.1's
/// four-step algorithm followed by the ban/timeout second gate.
pub fn has_permission(ctx: &PermissionContext, capability: Capability) -> bool {
    if ctx.is_banned {
        return false;
    }

    let granted = if ctx.user_id == ctx.server_owner_id {
        true
    } else {
        let mut allowed: HashSet<Capability> = HashSet::new();
        for role in ctx.roles {
            if ctx.member.role_ids.contains(&role.id) {
                allowed.extend(role.permissions.iter().copied());
            }
        }

        if ctx.include_channel_overwrites {
            // Role-scoped overwrites first, in no particular order (set ops, not sequence).
            for ow in ctx.overwrites {
                if ow.target == OverwriteTarget::Role && ctx.member.role_ids.contains(&ow.target_id)
                {
                    for d in &ow.deny {
                        allowed.remove(d);
                    }
                    for a in &ow.allow {
                        allowed.insert(*a);
                    }
                }
            }
            // Member-scoped overwrite is final and dominates role overwrites.
            for ow in ctx.overwrites {
                if ow.target == OverwriteTarget::Member && ow.target_id == ctx.user_id {
                    for d in &ow.deny {
                        allowed.remove(d);
                    }
                    for a in &ow.allow {
                        allowed.insert(*a);
                    }
                }
            }
        }

        allowed.contains(&capability)
    };

    if !granted {
        return false;
    }

    if capability == Capability::SendMessages && ctx.is_timed_out {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Member, Overwrite, OverwriteTarget, Role};

    fn role(id: &str, perms: &[Capability]) -> Role {
        Role {
            id: id.to_string(),
            server_id: "srv_1".into(),
            name: id.to_string(),
            permissions: perms.iter().copied().collect(),
            is_default: false,
            created_at: chrono::Utc::now(),
        }
    }

    fn member(roles: &[&str]) -> Member {
        Member {
            server_id: "srv_1".into(),
            user_id: "usr_2".into(),
            role_ids: roles.iter().map(|s| s.to_string()).collect(),
            joined_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn owner_bypasses_everything() {
        let roles = vec![];
        let m = member(&[]);
        let ctx = PermissionContext {
            server_owner_id: "usr_1",
            user_id: "usr_1",
            roles: &roles,
            member: &m,
            overwrites: &[],
            is_banned: false,
            is_timed_out: false,
            include_channel_overwrites: true,
        };
        assert!(has_permission(&ctx, Capability::ManageServer));
    }

    #[test]
    fn role_union_grants_capability() {
        let roles = vec![role("rol_muted", &[Capability::ReadMessages])];
        let m = member(&["rol_muted"]);
        let ctx = PermissionContext {
            server_owner_id: "usr_1",
            user_id: "usr_2",
            roles: &roles,
            member: &m,
            overwrites: &[],
            is_banned: false,
            is_timed_out: false,
            include_channel_overwrites: true,
        };
        assert!(has_permission(&ctx, Capability::ReadMessages));
        assert!(!has_permission(&ctx, Capability::SendMessages));
    }

    #[test]
    fn member_overwrite_dominates_role_overwrite() {
        let roles = vec![role(
            "rol_muted",
            &[Capability::ReadMessages, Capability::SendMessages],
        )];
        let m = member(&["rol_muted"]);
        let overwrites = vec![
            Overwrite {
                id: "ovr_1".into(),
                channel_id: "chn_1".into(),
                target: OverwriteTarget::Role,
                target_id: "rol_muted".into(),
                allow: HashSet::new(),
                deny: [Capability::SendMessages].into_iter().collect(),
                created_at: chrono::Utc::now(),
            },
            Overwrite {
                id: "ovr_2".into(),
                channel_id: "chn_1".into(),
                target: OverwriteTarget::Member,
                target_id: "usr_2".into(),
                allow: [Capability::SendMessages].into_iter().collect(),
                deny: HashSet::new(),
                created_at: chrono::Utc::now(),
            },
        ];
        let ctx = PermissionContext {
            server_owner_id: "usr_1",
            user_id: "usr_2",
            roles: &roles,
            member: &m,
            overwrites: &overwrites,
            is_banned: false,
            is_timed_out: false,
            include_channel_overwrites: true,
        };
        assert!(has_permission(&ctx, Capability::SendMessages));
    }

    #[test]
    fn timeout_denies_send_but_not_read() {
        let roles = vec![role(
            "rol_muted",
            &[Capability::ReadMessages, Capability::SendMessages],
        )];
        let m = member(&["rol_muted"]);
        let ctx = PermissionContext {
            server_owner_id: "usr_1",
            user_id: "usr_2",
            roles: &roles,
            member: &m,
            overwrites: &[],
            is_banned: false,
            is_timed_out: true,
            include_channel_overwrites: true,
        };
        assert!(!has_permission(&ctx, Capability::SendMessages));
        assert!(has_permission(&ctx, Capability::ReadMessages));
    }

    #[test]
    fn ban_denies_everything() {
        let roles = vec![role("rol_x", &[Capability::ReadMessages])];
        let m = member(&["rol_x"]);
        let ctx = PermissionContext {
            server_owner_id: "usr_1",
            user_id: "usr_2",
            roles: &roles,
            member: &m,
            overwrites: &[],
            is_banned: true,
            is_timed_out: false,
            include_channel_overwrites: true,
        };
        assert!(!has_permission(&ctx, Capability::ReadMessages));
    }
}
