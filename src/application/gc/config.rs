/// Process-level tunables of the collector, as opposed to per-run parameters
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Projects fetched per catalog page during association cleanup
    pub project_page_size: i64,
    /// `COUNT` hint for each cache scan step
    pub cache_scan_count: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            project_page_size: 50,
            cache_scan_count: 1000,
        }
    }
}

impl GcConfig {
    pub fn new(project_page_size: i64, cache_scan_count: usize) -> Self {
        Self {
            project_page_size,
            cache_scan_count,
        }
    }
}
