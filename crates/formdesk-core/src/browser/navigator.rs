//! Page loading and navigation.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::config::BrowserConfig;
use super::mutate::Notice;
use crate::export::{ExportRow, to_csv};
use crate::filter::filter_page;
use crate::query::{
    Cursor, PAGE_SIZE, QueryBuilder, SortDirection, SortField, SortOptions, SubmissionQuery,
};
use crate::store::SubmissionStore;
use crate::submission::Submission;
use crate::{Error, Result};

/// Where the browser is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A fetch for `page` is in flight.
    Loading {
        /// Page being fetched.
        page: usize,
    },
    /// The current page is loaded.
    Loaded,
    /// The last fetch failed; [`SubmissionBrowser::retry`] reloads its page.
    Failed(FetchFailure),
}

/// A failed page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// Page whose fetch failed.
    pub page: usize,
    /// Error description for display.
    pub message: String,
}

/// Cursor-based page cache.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    cursors: Vec<Cursor>,
    current_page: usize,
    items: Vec<Submission>,
    has_next: bool,
}

impl PageCache {
    /// Boundary cursors; `cursors()[n]` is the last item of page `n`.
    #[must_use]
    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    /// Zero-based index of the displayed page.
    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    /// Items of the displayed page, at most [`PAGE_SIZE`].
    #[must_use]
    pub fn items(&self) -> &[Submission] {
        &self.items
    }

    /// Whether the last fetch saw more items than fit on the page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.has_next
    }

    fn store_cursor(&mut self, page: usize, cursor: Cursor) {
        if let Some(slot) = self.cursors.get_mut(page) {
            *slot = cursor;
        } else {
            self.cursors.push(cursor);
        }
    }

    pub(super) fn invalidate_from(&mut self, page: usize) {
        self.cursors.truncate(page);
    }

    pub(super) fn item_mut(&mut self, id: &crate::SubmissionId) -> Option<&mut Submission> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    fn reset(&mut self) {
        self.cursors.clear();
        self.current_page = 0;
    }
}

/// Paginated view over a [`SubmissionStore`].
#[derive(Debug)]
pub struct SubmissionBrowser<S> {
    pub(super) store: S,
    config: BrowserConfig,
    options: SortOptions,
    search: String,
    pub(super) cache: PageCache,
    state: LoadState,
    pub(super) notice: Option<Notice>,
}

impl<S: SubmissionStore> SubmissionBrowser<S> {
    /// Create an idle browser over `store` with default listing options.
    #[must_use]
    pub fn new(store: S, config: BrowserConfig) -> Self {
        Self::with_options(store, config, SortOptions::default())
    }

    /// Create an idle browser with the given listing options.
    #[must_use]
    pub fn with_options(store: S, config: BrowserConfig, options: SortOptions) -> Self {
        Self {
            store,
            config,
            options,
            search: String::new(),
            cache: PageCache::default(),
            state: LoadState::Idle,
            notice: None,
        }
    }

    /// The injected store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Current listing options.
    pub const fn options(&self) -> SortOptions {
        self.options
    }

    /// Load state.
    pub const fn state(&self) -> &LoadState {
        &self.state
    }

    /// The page cache.
    pub const fn page(&self) -> &PageCache {
        &self.cache
    }

    /// Zero-based index of the displayed page.
    pub const fn current_page(&self) -> usize {
        self.cache.current_page
    }

    /// Whether "Next" is available.
    pub const fn has_next(&self) -> bool {
        self.cache.has_next
    }

    /// Whether "Previous" is available.
    pub const fn has_prev(&self) -> bool {
        self.cache.current_page > 0
    }

    /// All items of the loaded page, unfiltered.
    pub fn items(&self) -> &[Submission] {
        &self.cache.items
    }

    /// The local search string.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Set the local search string. Never fetches.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    /// Loaded items matching the search, in page order.
    pub fn visible(&self) -> Vec<&Submission> {
        filter_page(&self.cache.items, &self.search)
    }

    /// CSV bytes of the visible rows, `None` when nothing is visible.
    ///
    /// # Errors
    ///
    /// Returns an error if CSV serialization fails.
    pub fn export_csv(&self) -> Result<Option<Vec<u8>>> {
        let rows: Vec<ExportRow> = self.visible().into_iter().map(ExportRow::from).collect();
        to_csv(&rows)
    }

    /// Fetch page `page` and make it current.
    ///
    /// Page 0 needs no cursor; any other page resumes after the stored
    /// boundary of the page before it. On failure the browser enters
    /// [`LoadState::Failed`] with the error recorded for display.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CursorUnavailable`] if page `page - 1` was never
    /// loaded, or the fetch error.
    pub async fn load_page(&mut self, page: usize) -> Result<()> {
        let start_after = match page.checked_sub(1) {
            None => None,
            Some(previous) => Some(
                self.cache
                    .cursors
                    .get(previous)
                    .cloned()
                    .ok_or(Error::CursorUnavailable(page))?,
            ),
        };

        self.cache.current_page = page;
        self.state = LoadState::Loading { page };
        let query = QueryBuilder::new(self.options)
            .start_after(start_after)
            .build(Utc::now());

        match self.fetch(&query).await {
            Ok(mut items) => {
                self.cache.has_next = false;
                if items.len() > PAGE_SIZE {
                    match Cursor::at(&items[PAGE_SIZE - 1], self.options.field) {
                        Some(cursor) => {
                            self.cache.store_cursor(page, cursor);
                            self.cache.has_next = true;
                        }
                        None => warn!(
                            "Page {page} boundary has no {} value; stopping pagination",
                            self.options.field.as_str()
                        ),
                    }
                }
                if !self.cache.has_next {
                    self.cache.invalidate_from(page);
                }
                items.truncate(PAGE_SIZE);

                debug!(
                    "Loaded page {page}: {} items, has_next={}",
                    items.len(),
                    self.cache.has_next
                );
                self.cache.items = items;
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(err) => {
                warn!("Failed to load page {page}: {err}");
                self.cache.items.clear();
                self.cache.has_next = false;
                self.state = LoadState::Failed(FetchFailure {
                    page,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Reload the current page.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn refresh(&mut self) -> Result<()> {
        self.load_page(self.cache.current_page).await
    }

    /// Reload the page of a failed fetch. No-op unless in [`LoadState::Failed`].
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn retry(&mut self) -> Result<()> {
        let LoadState::Failed(failure) = &self.state else {
            return Ok(());
        };
        let page = failure.page;
        info!("Retrying page {page}");
        self.load_page(page).await
    }

    /// Advance one page. No-op when there is no next page.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn go_next(&mut self) -> Result<()> {
        if !self.cache.has_next {
            return Ok(());
        }
        self.load_page(self.cache.current_page + 1).await
    }

    /// Go back one page. No-op on the first page.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn go_prev(&mut self) -> Result<()> {
        if self.cache.current_page == 0 {
            return Ok(());
        }
        self.load_page(self.cache.current_page - 1).await
    }

    /// Replace all listing options. Any change clears every cursor and
    /// reloads page 0; identical options are a no-op.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn set_options(&mut self, options: SortOptions) -> Result<()> {
        if options == self.options {
            return Ok(());
        }
        info!(
            "Listing options changed: {} {}, latest_only={}",
            options.field.as_str(),
            options.direction.as_str(),
            options.latest_only
        );
        self.options = options;
        self.cache.reset();
        self.load_page(0).await
    }

    /// Change the sort field.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn set_sort_field(&mut self, field: SortField) -> Result<()> {
        self.set_options(SortOptions {
            field,
            ..self.options
        })
        .await
    }

    /// Change the sort direction.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn set_sort_direction(&mut self, direction: SortDirection) -> Result<()> {
        self.set_options(SortOptions {
            direction,
            ..self.options
        })
        .await
    }

    /// Switch the trailing-24-hours restriction.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn set_latest_only(&mut self, latest_only: bool) -> Result<()> {
        self.set_options(SortOptions {
            latest_only,
            ..self.options
        })
        .await
    }

    /// One bounded, retried round trip to the store.
    async fn fetch(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        let timeout = self.config.fetch_timeout;
        self.config
            .retry
            .run(|| async move {
                tokio::time::timeout(timeout, self.store.fetch(query))
                    .await
                    .map_err(|_| Error::Timeout(timeout))?
            })
            .await
    }
}
