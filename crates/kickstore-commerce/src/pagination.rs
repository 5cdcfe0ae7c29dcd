//! Paginated fetches.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Page metadata returned with a page of results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    /// Current page (1-indexed).
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = if total == 0 {
            1
        } else {
            u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Offset of the first item on this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.per_page as usize
    }
}

/// A page fetched under a [`PageCursor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Permission to fetch one page. Hand it back through
/// [`PageCursor::complete`] or [`PageCursor::fail`]; a ticket dropped without
/// either (the fetch was cancelled) releases the guard like a failure.
#[derive(Debug)]
#[must_use]
pub struct PageTicket {
    page: u32,
    generation: u64,
    state: Arc<Mutex<CursorState>>,
    settled: bool,
}

impl PageTicket {
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Settle the ticket; `apply` runs only if the cursor was not reset
    /// since the ticket was issued.
    fn settle(&mut self, apply: impl FnOnce(&mut CursorState)) -> bool {
        self.settled = true;
        let mut state = self.state.lock();
        if state.generation != self.generation {
            return false;
        }
        state.in_flight = false;
        apply(&mut state);
        true
    }
}

impl Drop for PageTicket {
    fn drop(&mut self) {
        if !self.settled {
            let page = self.page;
            self.settle(|state| state.next_page = page);
        }
    }
}

#[derive(Debug)]
struct CursorState {
    next_page: u32,
    in_flight: bool,
    exhausted: bool,
    generation: u64,
}

/// Monotonic page cursor with a single in-flight fetch.
///
/// Pages are handed out in order starting at 1. While a ticket is out no
/// other ticket is issued, so page N+1 cannot start before page N finished.
/// A failed or abandoned fetch releases the guard without advancing.
#[derive(Debug)]
pub struct PageCursor {
    state: Arc<Mutex<CursorState>>,
    per_page: u32,
}

impl PageCursor {
    pub fn new(per_page: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(CursorState {
                next_page: 1,
                in_flight: false,
                exhausted: false,
                generation: 0,
            })),
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Claim the next page, or `None` while a fetch is outstanding or once
    /// every page was fetched.
    pub fn begin(&self) -> Option<PageTicket> {
        let mut state = self.state.lock();
        if state.in_flight || state.exhausted {
            return None;
        }
        state.in_flight = true;
        Some(PageTicket {
            page: state.next_page,
            generation: state.generation,
            state: self.state.clone(),
            settled: false,
        })
    }

    /// Record a successful fetch and advance. Returns `false`, changing
    /// nothing, when the cursor was reset after the ticket was issued.
    pub fn complete(&self, mut ticket: PageTicket, has_more: bool) -> bool {
        let page = ticket.page;
        ticket.settle(|state| {
            state.next_page = page + 1;
            state.exhausted = !has_more;
        })
    }

    /// Release the guard after a failed fetch; the same page is retried next.
    pub fn fail(&self, mut ticket: PageTicket) {
        let page = ticket.page;
        ticket.settle(|state| state.next_page = page);
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.lock().exhausted
    }

    /// Next page that would be fetched.
    pub fn next_page(&self) -> u32 {
        self.state.lock().next_page
    }

    /// Start over from page 1. Tickets issued before the reset go stale.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = CursorState {
            next_page: 1,
            in_flight: false,
            exhausted: false,
            generation: state.generation + 1,
        };
    }
}
