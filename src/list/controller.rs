use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::debug;

use crate::cache::lock::mutex_lock;
use crate::config::ListSettings;
use crate::domain::{FilterField, FilterState, ListQuery, PaginatedResult};

use super::debounce::Debouncer;

const SOURCE: &str = "list::controller";
const TARGET: &str = "campus::list";

type Listener = Arc<dyn Fn(&ListQuery) + Send + Sync>;

struct ControllerState {
    query: ListQuery,
    /// From the most recently observed result; `None` until one arrives.
    last_page: Option<u32>,
}

struct ControllerInner {
    initial: ListQuery,
    state: Mutex<ControllerState>,
    search: Debouncer,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
}

/// Filter and pagination state of one list screen.
///
/// Every accepted transition notifies `on_change` listeners with the new
/// [`ListQuery`]. Rejected transitions change nothing and notify nobody.
#[derive(Clone)]
pub struct ListController {
    inner: Arc<ControllerInner>,
}

impl ListController {
    /// `initial` is what [`reset`](Self::reset) returns to; its page is forced to 1.
    pub fn new(initial: ListQuery, search_debounce: Duration) -> Self {
        let initial = initial.page(1);
        Self {
            inner: Arc::new(ControllerInner {
                state: Mutex::new(ControllerState {
                    query: initial.clone(),
                    last_page: None,
                }),
                initial,
                search: Debouncer::new(search_debounce),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
            }),
        }
    }

    pub fn from_settings(settings: &ListSettings) -> Self {
        Self::new(
            ListQuery::new().per_page(settings.per_page),
            settings.search_debounce(),
        )
    }

    pub fn query(&self) -> ListQuery {
        self.lock_state("query").query.clone()
    }

    pub fn filters(&self) -> FilterState {
        self.lock_state("filters").query.filters.clone()
    }

    pub fn page(&self) -> u32 {
        self.lock_state("page").query.page
    }

    /// Last page of the latest observed result, 1 before any result.
    pub fn last_page(&self) -> u32 {
        self.lock_state("last_page").last_page.unwrap_or(1)
    }

    pub fn active_filter_count(&self) -> usize {
        self.lock_state("active_filter_count")
            .query
            .filters
            .active_count()
    }

    /// Sets `field` and goes back to page 1. Blank values clear the field.
    pub fn set_filter(&self, field: FilterField, value: impl Into<String>) -> bool {
        self.apply_filter(field, Some(value.into()))
    }

    pub fn clear_filter(&self, field: FilterField) -> bool {
        self.apply_filter(field, None)
    }

    /// Moves to page `page` if it lies within `1..=last_page`.
    pub fn set_page(&self, page: u32) -> bool {
        let query = {
            let mut state = self.lock_state("set_page");
            let last_page = state.last_page.unwrap_or(1);
            if page < 1 || page > last_page {
                debug!(target: TARGET, page, last_page, "rejected page change");
                return false;
            }
            if state.query.page == page {
                return false;
            }
            state.query.page = page;
            state.query.clone()
        };
        self.notify(&query);
        true
    }

    /// Restores the initial filters and page and drops a pending search.
    pub fn reset(&self) -> bool {
        self.inner.search.cancel();
        let query = {
            let mut state = self.lock_state("reset");
            state.last_page = None;
            if state.query == self.inner.initial {
                return false;
            }
            state.query = self.inner.initial.clone();
            state.query.clone()
        };
        self.notify(&query);
        true
    }

    /// Records the pagination of the latest result.
    pub fn observe<T>(&self, result: &PaginatedResult<T>) {
        self.lock_state("observe").last_page = Some(result.last_page.max(1));
    }

    /// Debounced search: only the last text typed within the delay is applied.
    pub fn type_search(&self, text: impl Into<String>) {
        let text = text.into();
        let controller = self.downgrade();
        self.inner.search.schedule(move || {
            if let Some(controller) = controller.upgrade() {
                controller.set_filter(FilterField::Search, text);
            }
        });
    }

    pub fn has_pending_search(&self) -> bool {
        self.inner.search.is_pending()
    }

    /// Registers `callback`, run with the new query after each accepted transition.
    pub fn on_change(
        &self,
        callback: impl Fn(&ListQuery) + Send + Sync + 'static,
    ) -> ControllerListener {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        mutex_lock(&self.inner.listeners, SOURCE, "on_change").push((id, Arc::new(callback)));
        ControllerListener {
            controller: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Cancels the pending search and drops every listener.
    pub fn teardown(&self) {
        self.inner.search.cancel();
        mutex_lock(&self.inner.listeners, SOURCE, "teardown").clear();
    }

    pub fn downgrade(&self) -> WeakListController {
        WeakListController {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn apply_filter(&self, field: FilterField, value: Option<String>) -> bool {
        let query = {
            let mut state = self.lock_state("set_filter");
            let filter_changed = state.query.filters.set(field, value);
            let page_changed = state.query.page != 1;
            state.query.page = 1;
            if !filter_changed && !page_changed {
                return false;
            }
            state.query.clone()
        };
        debug!(target: TARGET, field = %field, "filter changed");
        self.notify(&query);
        true
    }

    fn notify(&self, query: &ListQuery) {
        let listeners: Vec<Listener> = mutex_lock(&self.inner.listeners, SOURCE, "notify")
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(query);
        }
    }

    fn lock_state(&self, op: &'static str) -> std::sync::MutexGuard<'_, ControllerState> {
        mutex_lock(&self.inner.state, SOURCE, op)
    }
}

/// Non-owning controller handle; does not keep a pending search alive.
#[derive(Clone)]
pub struct WeakListController {
    inner: Weak<ControllerInner>,
}

impl WeakListController {
    pub fn upgrade(&self) -> Option<ListController> {
        self.inner.upgrade().map(|inner| ListController { inner })
    }
}

/// Removes its listener when dropped.
pub struct ControllerListener {
    controller: Weak<ControllerInner>,
    id: u64,
}

impl Drop for ControllerListener {
    fn drop(&mut self) {
        if let Some(inner) = self.controller.upgrade() {
            mutex_lock(&inner.listeners, SOURCE, "remove_listener")
                .retain(|(listener, _)| *listener != self.id);
        }
    }
}
