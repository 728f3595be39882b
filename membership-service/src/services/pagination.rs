//! Slice arithmetic for the combined listing.
//!
//! A listing is one logical sequence: every granted member first, then every
//! invitee. Only the invitees are paged in memory, so for a requested page we
//! need the half-open range of the invite list that falls on it.

/// Range `[start, end)` of the invite list shown on `page` (1-based; page 0
/// is treated as page 1). Always `start <= end <= invite_count`.
pub fn invite_slice_bounds(
    limit: usize,
    granted_count: usize,
    page: usize,
    invite_count: usize,
) -> (usize, usize) {
    if limit == 0 {
        return (0, 0);
    }

    let limit = limit as i64;
    let granted = granted_count as i64;
    let page = page.max(1) as i64;

    // Pages touched by granted members, and the room left on the last one.
    let member_pages = (granted + limit - 1) / limit;
    let free_slots = limit * member_pages - granted;

    let pages_past_members = page - member_pages;
    let start = (limit * pages_past_members - (limit - free_slots)).max(0);
    let end = (limit * pages_past_members + free_slots).clamp(0, invite_count as i64);

    let start = start.min(end);
    (start as usize, end as usize)
}
