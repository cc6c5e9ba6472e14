//! Page slicing for the advertisement list

/// Default number of advertisements per page
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// One page of a larger collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// Items on this page
    pub items: &'a [T],
    /// 1-indexed page number actually served (after clamping)
    pub page: usize,
    /// Number of pages, `ceil(total / page_size)`
    pub total_pages: usize,
    /// Size of the whole collection
    pub total: usize,
    /// 0-based position of `items[0]` in the whole collection
    pub offset: usize,
}

impl<T> Page<'_, T> {
    /// Whether a previous page exists
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether the collection is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Number of pages needed for `total` items
#[must_use]
pub const fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(if page_size == 0 { 1 } else { page_size })
}

/// Slices `items` into the requested 1-indexed page.
///
/// Page numbers outside `1..=total_pages` are clamped to the nearest valid
/// page, and a zero page size is treated as one.
///
/// # Examples
///
/// ```
/// use ads_bot::pagination::paginate;
///
/// let items: Vec<u32> = (1..=7).collect();
/// let page = paginate(&items, 2, 5);
/// assert_eq!(page.items, &[6, 7]);
/// assert_eq!(page.total_pages, 2);
/// assert!(!page.has_next());
/// ```
#[must_use]
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let total_pages = total_pages(total, page_size);

    if total_pages == 0 {
        return Page {
            items: &[],
            page: 1,
            total_pages,
            total,
            offset: 0,
        };
    }

    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total);

    Page {
        items: &items[start..end],
        page,
        total_pages,
        total,
        offset: start,
    }
}
