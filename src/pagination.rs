use serde::Serialize;

pub const MAX_PAGE_SIZE: usize = 100;

/// A validated page request. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn clamped(page: Option<i64>, page_size: Option<i64>, default_size: usize) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size.map_or(default_size as i64, |size| {
            size.clamp(1, MAX_PAGE_SIZE as i64)
        });

        Self {
            page: usize::try_from(page).unwrap_or(1),
            page_size: usize::try_from(page_size).unwrap_or(default_size),
        }
    }

    /// Cuts one page out of `items`. A page past the end is empty.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let total_items = items.len();
        let total_pages = total_items.div_ceil(self.page_size);
        let start = (self.page - 1).saturating_mul(self.page_size);

        let page_items = items
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();

        Page {
            items: page_items,
            page: self.page,
            page_size: self.page_size,
            total_items,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}
