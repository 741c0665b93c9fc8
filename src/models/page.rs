use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub total: usize,
    pub limit: usize,
    pub skip: usize,
    pub has_more: bool,
}

impl PageMeta {
    pub fn new(total: usize, limit: usize, skip: usize) -> Self {
        Self {
            total,
            limit,
            skip,
            has_more: skip + limit < total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// Applies skip/limit to an already-filtered, already-sorted vector and
/// wraps it with pagination metadata.
pub fn paginate<T>(mut items: Vec<T>, limit: usize, skip: usize) -> Page<T> {
    let total = items.len();
    let items: Vec<T> = items.drain(..).skip(skip).take(limit).collect();
    Page {
        items,
        meta: PageMeta::new(total, limit, skip),
    }
}

#[cfg(test)]
mod tests {
    use super::{PageMeta, paginate};

    #[test]
    fn has_more_false_on_last_page() {
        let meta = PageMeta::new(25, 10, 20);
        assert!(!meta.has_more);
    }

    #[test]
    fn has_more_true_when_results_remain() {
        let meta = PageMeta::new(25, 10, 10);
        assert!(meta.has_more);
    }

    #[test]
    fn paginate_skips_and_limits() {
        let page = paginate((0..25).collect::<Vec<_>>(), 10, 20);
        assert_eq!(page.items, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.meta.total, 25);
        assert!(!page.meta.has_more);
    }
}
