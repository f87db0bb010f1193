//! Shared types and streaming infrastructure for list endpoints.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of items plus the number of the page after it, if there is one.
pub type PageParts<T> = (VecDeque<T>, Option<u32>);

/// A page request in flight. The fetcher travels with it and comes back on completion.
type PendingPage<'a, F, T> = Pin<Box<dyn Future<Output = eyre::Result<(F, PageParts<T>)>> + Send + 'a>>;

/// A paginated stream that fetches subsequent pages from a list endpoint on demand.
///
/// List endpoints here address pages by number rather than by an opaque cursor: every response
/// carries its `currentPage` and the `pagesTotal`, so the next page is simply the current one
/// plus one until the last is reached (see [`Pagination::next_page`]). Pages count from 1.
///
/// The fetcher is handed a page number and returns that page's items along with the number of
/// the next page. Items are yielded one by one, and the next page is only requested once the
/// current one has been drained. The stream ends after the last page or the first error.
pub struct PagedStream<'a, T, F> {
    buffered: VecDeque<T>,
    /// `None` once there is nothing left to fetch.
    next_page: Option<PendingPage<'a, F, T>>,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(u32) -> Fut + Send + 'a,
        Fut: Future<Output = eyre::Result<PageParts<T>>> + Send + 'a,
    {
        Self {
            buffered: VecDeque::new(),
            next_page: Some(fetch(fetcher, 1)),
        }
    }
}

fn fetch<'a, T, F, Fut>(fetcher: F, page: u32) -> PendingPage<'a, F, T>
where
    F: Fn(u32) -> Fut + Send + 'a,
    Fut: Future<Output = eyre::Result<PageParts<T>>> + Send + 'a,
{
    Box::pin(async move {
        let parts = fetcher(page).await?;
        Ok((fetcher, parts))
    })
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(u32) -> Fut + Send + 'a,
    Fut: Future<Output = eyre::Result<PageParts<T>>> + Send + 'a,
{
    type Item = eyre::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }
            let Some(pending) = self.next_page.as_mut() else {
                return Poll::Ready(None);
            };

            match std::task::ready!(pending.as_mut().poll(cx)) {
                Ok((fetcher, (items, following))) => {
                    self.buffered.extend(items);
                    // not polled until `buffered` runs dry
                    self.next_page = following.map(|page| fetch(fetcher, page));
                }
                Err(e) => {
                    self.next_page = None;
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}

/// Paging details attached to every list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// The page this response holds, counting from 1.
    pub current_page: u32,
    /// How many items a full page holds.
    pub page_size: u32,
    /// How many pages the whole result set spans.
    pub pages_total: u32,
    /// How many items the whole result set has.
    pub items_total: u32,
}

impl Pagination {
    /// The page after this one, if any.
    pub fn next_page(&self) -> Option<u32> {
        (self.current_page < self.pages_total).then(|| self.current_page + 1)
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: VecDeque<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Splits the page into what [`PagedStream`] fetchers return.
    pub fn into_parts(self) -> PageParts<T> {
        let next = self.pagination.next_page();
        (self.data, next)
    }
}
