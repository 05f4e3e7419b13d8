/// Page bounds for one request over `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Requested page clamped into `1..=total_pages`.
    pub page: u32,
    /// Never zero; an empty list still has one (empty) page.
    pub total_pages: u32,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn compute(total: u64, page_size: u32, requested: u32) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total.div_ceil(u64::from(page_size)).max(1);
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
        let page = requested.clamp(1, total_pages);

        Self {
            page,
            total_pages,
            offset: u64::from(page - 1) * u64::from(page_size),
            limit: u64::from(page_size),
        }
    }
}
