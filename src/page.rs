use serde::Deserialize;

/// One page of a paginated listing, as served by the backend.
///
/// Pages are immutable once received; the feed layer only ever appends
/// their content. Unknown server fields (sort metadata, offsets) are
/// ignored; a page missing any of these fields fails to decode at the
/// boundary instead of propagating holes downstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero-based page index.
    #[serde(rename = "number")]
    pub page_number: u32,
    /// Authoritative termination flag; once set, no further page exists.
    #[serde(rename = "last")]
    pub is_last: bool,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(
        content: Vec<T>,
        page_number: u32,
        is_last: bool,
        total_pages: u32,
        total_elements: u64,
    ) -> Self {
        Self {
            content,
            page_number,
            is_last,
            total_pages,
            total_elements,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Log internally inconsistent page metadata without rejecting the
    /// page. The content is still usable; the warning makes the server
    /// fault visible instead of silently absorbing it.
    pub fn flag_suspect(&self) {
        if self.content.is_empty() && !self.is_last {
            tracing::warn!(page = self.page_number, "empty page not marked as last");
        }
        if self.total_pages > 0 && self.page_number >= self.total_pages {
            tracing::warn!(
                page = self.page_number,
                total_pages = self.total_pages,
                "page number out of declared range"
            );
        }
    }
}

/// Identity used when folding pages into a feed.
///
/// An item whose key was already seen on an earlier page is dropped,
/// first occurrence wins.
pub trait Keyed {
    type Key: Eq + std::hash::Hash;

    fn key(&self) -> Self::Key;
}
