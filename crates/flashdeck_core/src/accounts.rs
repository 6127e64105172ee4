//! crates/flashdeck_core/src/accounts.rs
//!
//! Account rules that sit on top of the `AccountStore`: registration and the
//! admin user-management actions. There must always be at least one admin.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{NewUser, Role, User, UserId};
use crate::ports::{AccountStore, CardStore, PortError, PortResult};

/// What an admin action did, and whether the caller's login must end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOutcome {
    pub user: User,
    /// Set when admins act on their own account while another admin remains.
    pub end_caller_session: bool,
}

#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    cards: Arc<dyn CardStore>,
}

impl AccountService {
    pub fn new(accounts: Arc<dyn AccountStore>, cards: Arc<dyn CardStore>) -> Self {
        Self { accounts, cards }
    }

    /// Registers a normal user. The password must already be hashed.
    pub async fn register(&self, username: &str, email: &str, hashed_password: String) -> PortResult<User> {
        let user = self
            .accounts
            .create_user(NewUser {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                hashed_password,
                role: Role::Normal,
            })
            .await?;
        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Creates `admin` when the system has no admin yet. Returns the new account if one was made.
    pub async fn ensure_admin(&self, admin: NewUser) -> PortResult<Option<User>> {
        if self.accounts.count_admins().await? > 0 {
            return Ok(None);
        }
        let user = self
            .accounts
            .create_user(NewUser {
                role: Role::Admin,
                ..admin
            })
            .await?;
        info!("Bootstrapped admin account {}", user.username);
        Ok(Some(user))
    }

    pub async fn has_admin(&self) -> PortResult<bool> {
        Ok(self.accounts.count_admins().await? > 0)
    }

    pub async fn list_users(&self, caller: &User) -> PortResult<Vec<User>> {
        require_admin(caller)?;
        self.accounts.list_users().await
    }

    /// Deletes a user and, explicitly, every card they own.
    pub async fn delete_user(&self, caller: &User, target_id: UserId) -> PortResult<AdminOutcome> {
        require_admin(caller)?;
        let target = self.accounts.get_user(target_id).await?;
        let admin_count = self.guard_last_admin(&target).await?;

        let removed = self.cards.delete_cards_by_user(target.id).await?;
        self.accounts.delete_user(target.id).await?;
        info!("Admin {} deleted user {} and {} cards", caller.id, target.username, removed);

        Ok(AdminOutcome {
            end_caller_session: target.id == caller.id && admin_count > 1,
            user: target,
        })
    }

    /// Swaps a user between `Normal` and `Admin`.
    pub async fn toggle_role(&self, caller: &User, target_id: UserId) -> PortResult<AdminOutcome> {
        require_admin(caller)?;
        let mut target = self.accounts.get_user(target_id).await?;
        let admin_count = self.guard_last_admin(&target).await?;

        target.role = target.role.toggled();
        self.accounts.set_role(target.id, target.role).await?;
        info!("Admin {} changed {}'s role to {}", caller.id, target.username, target.role);

        Ok(AdminOutcome {
            end_caller_session: target.id == caller.id && admin_count > 1,
            user: target,
        })
    }

    /// Refuses to remove the last admin; returns the current admin count.
    async fn guard_last_admin(&self, target: &User) -> PortResult<u64> {
        let admin_count = self.accounts.count_admins().await?;
        if target.is_admin() && admin_count <= 1 {
            warn!("Refused to remove the last admin ({})", target.username);
            return Err(PortError::LastAdmin);
        }
        Ok(admin_count)
    }
}

fn require_admin(caller: &User) -> PortResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(PortError::Forbidden)
    }
}
