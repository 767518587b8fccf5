//! Quota guard — check-then-debit of a tenant's send allowance.
//!
//! `try_reserve` never mutates; the debit happens in `commit`, after the
//! send attempts, through the store's single conditional increment. That
//! increment is the only synchronization between concurrent runs for the
//! same tenant.

use std::sync::Arc;

use tracing::debug;

use crate::error::DatabaseError;
use crate::model::{MessageType, QuotaAccount};
use crate::store::Store;

/// Outcome of a reservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// Enough allowance remains for the requested count.
    Accepted { remaining: u32 },
    /// Not enough allowance. Figures are returned so the caller can tell
    /// the tenant exactly where they stand. A missing quota account
    /// reports zero across the board.
    Rejected {
        limit: u32,
        used: u32,
        remaining: u32,
        requested: u32,
    },
}

/// Guards a tenant's per-message-type send quota.
pub struct QuotaGuard {
    store: Arc<dyn Store>,
}

impl QuotaGuard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Check whether `count` sends fit in the remaining allowance.
    /// Read-only — rejection leaves the account untouched.
    pub async fn try_reserve(
        &self,
        tenant_id: &str,
        message_type: MessageType,
        count: u32,
    ) -> Result<Reservation, DatabaseError> {
        let account = self.store.get_quota(tenant_id, message_type).await?;

        let reservation = match account {
            None => Reservation::Rejected {
                limit: 0,
                used: 0,
                remaining: 0,
                requested: count,
            },
            Some(account) if account.remaining() < count => Reservation::Rejected {
                limit: account.limit,
                used: account.used,
                remaining: account.remaining(),
                requested: count,
            },
            Some(account) => Reservation::Accepted {
                remaining: account.remaining(),
            },
        };

        debug!(tenant = %tenant_id, %message_type, count, ?reservation, "Quota reservation check");
        Ok(reservation)
    }

    /// Charge the account for `count` attempted sends. Called once per run,
    /// after every chunk attempt has finished.
    pub async fn commit(
        &self,
        tenant_id: &str,
        message_type: MessageType,
        count: u32,
    ) -> Result<QuotaAccount, DatabaseError> {
        let account = self.store.debit_quota(tenant_id, message_type, count).await?;
        debug!(
            tenant = %tenant_id,
            %message_type,
            count,
            used = account.used,
            limit = account.limit,
            "Quota committed"
        );
        Ok(account)
    }
}
