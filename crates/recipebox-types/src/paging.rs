/// A resolved `page`/`limit` pair. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Lenient parse of raw query values: anything missing, unparsable or
    /// below 1 falls back to page 1 / `default_limit`.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u32) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<u32>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// `ceil(total / limit)`; an empty result set has zero pages.
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.limit as u64)
    }
}
