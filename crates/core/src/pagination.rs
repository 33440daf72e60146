//! Paged listings and the page-link window shared by every admin table.

use serde::{Deserialize, Serialize};

/// Fixed page size for admin listings.
pub const PAGE_SIZE: u32 = 10;

/// Pages shown on each side of the current page.
const WINDOW_RADIUS: u32 = 2;

/// Paging metadata returned alongside every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

const fn default_per_page() -> u32 {
    PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total: 0,
            current_page: 1,
            total_pages: 0,
            per_page: PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Whether the page-link widget should be rendered.
    #[must_use]
    pub fn shows_controls(&self) -> bool {
        self.total > u64::from(self.per_page)
    }

    /// The page links to render for this listing.
    #[must_use]
    pub fn nav(&self) -> PageNav {
        PageNav::new(self.current_page, self.total_pages)
    }
}

/// One entry of the page-link window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    /// A numbered page link.
    Page(u32),
    /// A collapsed run of pages.
    Ellipsis,
}

impl PageItem {
    /// The page number, or `None` for an ellipsis.
    #[must_use]
    pub const fn number(self) -> Option<u32> {
        match self {
            Self::Page(n) => Some(n),
            Self::Ellipsis => None,
        }
    }
}

/// Compute the page links for `current` out of `total` pages.
///
/// The first and last pages are always present, as are the pages within
/// two of `current`. Each gap between those is collapsed into a single
/// [`PageItem::Ellipsis`]. `current` is clamped into `1..=total`.
///
/// ```
/// use eventconnect_core::pagination::{page_window, PageItem::{Ellipsis, Page}};
///
/// assert_eq!(
///     page_window(5, 10),
///     vec![Page(1), Ellipsis, Page(3), Page(4), Page(5), Page(6), Page(7), Ellipsis, Page(10)]
/// );
/// ```
#[must_use]
pub fn page_window(current: u32, total: u32) -> Vec<PageItem> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let low = current.saturating_sub(WINDOW_RADIUS).max(1);
    let high = current.saturating_add(WINDOW_RADIUS).min(total);

    let mut items = Vec::with_capacity((high - low) as usize + 5);
    if low > 1 {
        items.push(PageItem::Page(1));
        if low > 2 {
            items.push(PageItem::Ellipsis);
        }
    }
    items.extend((low..=high).map(PageItem::Page));
    if high < total {
        if high < total - 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(total));
    }
    items
}

/// Page links plus previous/next targets, ready for a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNav {
    pub current: u32,
    pub total: u32,
    pub items: Vec<PageItem>,
}

impl PageNav {
    #[must_use]
    pub fn new(current: u32, total: u32) -> Self {
        let current = if total == 0 { 1 } else { current.clamp(1, total) };
        Self {
            current,
            total,
            items: page_window(current, total),
        }
    }

    /// Target of the "previous" link.
    #[must_use]
    pub fn prev(&self) -> u32 {
        self.current.saturating_sub(1).max(1)
    }

    /// Target of the "next" link.
    #[must_use]
    pub fn next(&self) -> u32 {
        self.current.saturating_add(1).min(self.total.max(1))
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current < self.total
    }
}
