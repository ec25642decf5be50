use crate::api::{UserContentApi, MAX_PAGE_SIZE};
use crate::content::{ContentItem, Deletable};
use eraser_core::{
    ContentKind, CoreError, DeletionReport, ErrorReporter, StopReason, DEFAULT_DELETE_DELAY,
};
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct DeleterConfig {
    /// Pause after every attempted delete.
    pub delay: Duration,
    pub page_size: u32,
}

impl Default for DeleterConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELETE_DELAY,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl DeleterConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Lazily walks a user's history of one kind, newest first.
pub struct ContentPager<'a, A: UserContentApi + ?Sized> {
    api: &'a A,
    username: String,
    kind: ContentKind,
    page_size: u32,
    remaining: Option<usize>,
    after: Option<String>,
    buffer: VecDeque<ContentItem>,
    exhausted: bool,
}

impl<'a, A: UserContentApi + ?Sized> ContentPager<'a, A> {
    pub fn new(
        api: &'a A,
        username: impl Into<String>,
        kind: ContentKind,
        limit: Option<usize>,
        page_size: u32,
    ) -> Self {
        Self {
            api,
            username: username.into(),
            kind,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            remaining: limit,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub async fn next_item(&mut self) -> Result<Option<ContentItem>, CoreError> {
        if self.remaining == Some(0) {
            return Ok(None);
        }

        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }

        let item = self.buffer.pop_front();
        if item.is_some() {
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
        }
        Ok(item)
    }

    async fn fetch_page(&mut self) -> Result<(), CoreError> {
        let request_size = match self.remaining {
            Some(remaining) => (remaining.min(self.page_size as usize)) as u32,
            None => self.page_size,
        };

        let page = self
            .api
            .list_user_content(&self.username, self.kind, request_size, self.after.as_deref())
            .await?;
        debug!(
            "Fetched {} {} (after: {:?})",
            page.items.len(),
            self.kind.plural(),
            page.after
        );

        if page.items.is_empty() || page.after.is_none() || page.after == self.after {
            self.exhausted = true;
        }
        self.after = page.after;
        self.buffer.extend(page.items);
        Ok(())
    }
}

/// Deletes the authenticated user's content of one kind, one item at a time.
pub struct ContentDeleter<'a, A: UserContentApi + ?Sized> {
    api: &'a A,
    config: DeleterConfig,
    reporter: ErrorReporter,
}

impl<'a, A: UserContentApi + ?Sized> ContentDeleter<'a, A> {
    pub fn new(api: &'a A, config: DeleterConfig) -> Self {
        Self {
            api,
            config,
            reporter: ErrorReporter::new(),
        }
    }

    pub async fn run(
        &self,
        kind: ContentKind,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> DeletionReport {
        let mut report = DeletionReport::new(kind);

        let user = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.stop_reason = StopReason::Cancelled;
                return report;
            }
            user = self.api.current_user() => user,
        };
        let user = match user {
            Ok(user) => user,
            Err(e) => {
                error!("Error fetching {}: {}", kind.plural(), e);
                report.stop_reason = StopReason::EnumerationFailed;
                return report;
            }
        };

        info!(
            "Starting {} deletion process for user: {}",
            kind.label(),
            user.name
        );
        let mut pager = ContentPager::new(self.api, user.name, kind, limit, self.config.page_size);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.stop_reason = StopReason::Cancelled;
                    break;
                }
                next = pager.next_item() => next,
            };

            let item = match next {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    error!("Error fetching {}: {}", kind.plural(), e);
                    report.stop_reason = StopReason::EnumerationFailed;
                    break;
                }
            };

            info!("{}", item.describe());
            info!(
                "Posted on: {}",
                item.created_at().format("%Y-%m-%d %H:%M:%S UTC")
            );
            info!("Score: {}", item.score());

            // An in-flight delete always runs to completion so it is counted.
            match self.api.delete_item(&item).await {
                Ok(()) => {
                    report.deleted += 1;
                    debug!("Deleted {} {}", kind, item.fullname());
                }
                Err(e) => {
                    report.failed += 1;
                    self.reporter
                        .report_warning(&format!("Error deleting {} {}", kind, item.fullname()), &e);
                }
            }
            info!("{}", "-".repeat(50));

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.stop_reason = StopReason::Cancelled;
                    break;
                }
                _ = tokio::time::sleep(self.config.delay) => {}
            }
        }

        match report.stop_reason {
            StopReason::Cancelled => info!("Deletion interrupted by user."),
            _ => info!(
                "Finished deleting {}: {} deleted, {} failed.",
                kind.plural(),
                report.deleted,
                report.failed
            ),
        }
        report
    }
}
