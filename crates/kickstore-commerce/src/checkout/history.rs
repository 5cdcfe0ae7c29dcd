//! A user's order history, fetched page by page.

use crate::checkout::{Order, OrderRepository};
use crate::error::CommerceError;
use crate::ids::UserId;
use crate::pagination::PageCursor;
use parking_lot::Mutex;
use std::sync::Arc;

/// Loads `GET /orders/user` pages strictly in order, one request at a time.
pub struct OrderHistory {
    orders: Arc<dyn OrderRepository>,
    user_id: UserId,
    cursor: PageCursor,
    loaded: Mutex<Vec<Order>>,
}

impl OrderHistory {
    pub fn new(orders: Arc<dyn OrderRepository>, user_id: UserId, per_page: u32) -> Self {
        Self {
            orders,
            user_id,
            cursor: PageCursor::new(per_page),
            loaded: Mutex::new(Vec::new()),
        }
    }

    /// Fetch the next page. Returns how many orders it added, or `None` when
    /// a fetch is already running, every page was loaded, or the history was
    /// reset while the page was on its way. Dropping the future mid-fetch
    /// frees the history for the next call.
    pub async fn load_next(&self) -> Result<Option<usize>, CommerceError> {
        let Some(ticket) = self.cursor.begin() else {
            return Ok(None);
        };

        let page = ticket.page();
        match self
            .orders
            .list_for_user(&self.user_id, page, self.cursor.per_page())
            .await
        {
            Ok(result) => {
                let added = result.items.len();
                let mut loaded = self.loaded.lock();
                let has_more = result.pagination.has_next() && added > 0;
                if !self.cursor.complete(ticket, has_more) {
                    tracing::debug!(user_id = %self.user_id, page, "order history reset mid-fetch, page discarded");
                    return Ok(None);
                }
                loaded.extend(result.items);
                tracing::debug!(user_id = %self.user_id, page, added, "order history page loaded");
                Ok(Some(added))
            }
            Err(e) => {
                self.cursor.fail(ticket);
                Err(e)
            }
        }
    }

    pub fn orders(&self) -> Vec<Order> {
        self.loaded.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.cursor.is_in_flight()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor.is_exhausted()
    }

    /// Drop loaded orders and start again from the first page.
    pub fn reset(&self) {
        self.loaded.lock().clear();
        self.cursor.reset();
    }
}
