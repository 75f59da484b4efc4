//! Page-window arithmetic for paginated product lists

/// Maximum number of page buttons shown at once
pub const MAX_PAGE_BUTTONS: u32 = 5;

/// Clamp a requested page into `1..=max(1, total_pages)`
pub fn clamp_page(page: i64, total_pages: u32) -> u32 {
    let last = i64::from(total_pages.max(1));
    // in range 1..=u32::MAX after the clamp
    u32::try_from(page.clamp(1, last)).unwrap_or(1)
}

/// Page numbers to display around `current`
///
/// The window holds at most [`MAX_PAGE_BUTTONS`] pages, starts two pages before
/// `current` and is shifted left when it would run past the last page.
pub fn page_numbers(current: u32, total_pages: u32) -> Vec<u32> {
    if total_pages == 0 {
        return vec![1];
    }

    let mut start = current.saturating_sub(2).max(1);
    let mut end = start + MAX_PAGE_BUTTONS - 1;

    if end > total_pages {
        end = total_pages;
        start = end.saturating_sub(MAX_PAGE_BUTTONS - 1).max(1);
    }

    (start..=end).collect()
}
