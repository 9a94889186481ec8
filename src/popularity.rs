#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewMetrics {
    pub total_reviews: Option<i64>,
    pub positive_ratio: Option<f64>,
}

/// Both outputs are computed together so they never drift apart.
///
/// The ratio only exists for a strictly positive total; zero, negative or
/// missing totals leave it null rather than defaulting to 0 or 1.
pub fn compute(positive: Option<i64>, negative: Option<i64>) -> ReviewMetrics {
    let total_reviews = match (positive, negative) {
        (Some(p), Some(n)) => p.checked_add(n),
        _ => None,
    };
    let positive_ratio = match (positive, total_reviews) {
        (Some(p), Some(total)) if total > 0 => Some(p as f64 / total as f64),
        _ => None,
    };
    ReviewMetrics {
        total_reviews,
        positive_ratio,
    }
}
