//! Merge-on-login.

use crate::cart::Cart;
use crate::catalog::CatalogReader;
use crate::error::CommerceError;
use crate::ids::UserId;
use crate::sync::{CartApi, LocalCartItem, LocalCartStore};
use crate::validation::IntegrityValidator;
use std::sync::atomic::{AtomicBool, Ordering};

/// A local line that did not reach the server cart.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedTransfer {
    pub line: LocalCartItem,
    pub reason: String,
}

/// Result of a merge that transferred at least one line.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub attempted: usize,
    pub transferred: usize,
    /// Lines that failed. They are dropped: not retried, not queued.
    pub failed: Vec<FailedTransfer>,
    /// Server cart after the last successful transfer.
    pub server_cart: Cart,
}

impl MergeReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// What a login trigger did.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// A merge already ran in this authenticated session.
    Skipped,
    /// The local cart was empty.
    Empty,
    Merged(MergeReport),
}

/// Transfers the device-local cart into the server cart once per
/// authenticated session.
///
/// The sticky flag is set before the attempt and cleared only by
/// [`SyncEngine::reset`] on logout, so repeated login triggers never
/// duplicate lines. A merge that transfers nothing keeps the local cart; on
/// logout it is parked for the same user and picked up by their next merge.
#[derive(Debug, Default)]
pub struct SyncEngine {
    merged: AtomicBool,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this session already merged.
    pub fn has_merged(&self) -> bool {
        self.merged.load(Ordering::SeqCst)
    }

    /// Re-arm the merge for the next login.
    pub fn reset(&self) {
        self.merged.store(false, Ordering::SeqCst);
    }

    pub async fn merge_on_login(
        &self,
        user_id: &UserId,
        local: &LocalCartStore,
        api: &dyn CartApi,
        validator: &IntegrityValidator,
        catalog: &dyn CatalogReader,
    ) -> Result<MergeOutcome, CommerceError> {
        if self.merged.swap(true, Ordering::SeqCst) {
            tracing::debug!(user_id = %user_id, "merge already ran for this session");
            return Ok(MergeOutcome::Skipped);
        }

        let reclaimed = local.reclaim_for(user_id)?;
        if reclaimed > 0 {
            tracing::info!(user_id = %user_id, reclaimed, "picked up lines parked by an earlier session");
        }

        let lines = local.load()?.items;
        if lines.is_empty() {
            return Ok(MergeOutcome::Empty);
        }

        let attempted = lines.len();
        tracing::info!(user_id = %user_id, attempted, "merging local cart into server cart");

        let mut server_cart = None;
        let mut failed = Vec::new();
        for line in lines {
            let result = match validator
                .validate_with_catalog(&line.to_request(), catalog)
                .await
            {
                Ok(item) => api.add_item(user_id, &item).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(cart) => server_cart = Some(cart),
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        sneaker_id = line.sneaker_id.as_deref().unwrap_or("?"),
                        error = %e,
                        "local cart line failed to transfer"
                    );
                    failed.push(FailedTransfer {
                        line,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let Some(server_cart) = server_cart else {
            tracing::warn!(user_id = %user_id, attempted, "merge transferred nothing, keeping local cart");
            return Err(CommerceError::MergeFailed { attempted });
        };

        local.clear()?;
        let transferred = attempted - failed.len();
        tracing::info!(
            user_id = %user_id,
            transferred,
            failed = failed.len(),
            "local cart merged"
        );
        Ok(MergeOutcome::Merged(MergeReport {
            attempted,
            transferred,
            failed,
            server_cart,
        }))
    }
}
