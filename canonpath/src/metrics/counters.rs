use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

pub static PATHS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "canonpath_paths_total",
        "Paths cleaned, by caller and whether a rewrite was needed",
        &["source", "outcome"]
    )
        .expect("register canonpath_paths_total")
});

pub static PATH_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![1.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0, 4096.0];
    register_histogram_vec!(
        "canonpath_path_bytes",
        "Length of raw input paths in bytes",
        &["source"],
        buckets
    )
        .expect("register canonpath_path_bytes")
});

pub static REDIRECTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "canonpath_redirects_total",
        "Redirects to a canonical location",
        &["status"]
    )
        .expect("register canonpath_redirects_total")
});

#[inline]
pub fn on_path(source: &str, raw_len: usize, canonical: bool) {
    let outcome = if canonical { "canonical" } else { "rewritten" };
    PATHS_TOTAL.with_label_values(&[source, outcome]).inc();
    PATH_BYTES
        .with_label_values(&[source])
        .observe(raw_len as f64);
}

#[inline]
pub fn inc_redirect(status: u16) {
    let status = status.to_string();
    REDIRECTS_TOTAL
        .with_label_values(&[status.as_str()])
        .inc();
}
