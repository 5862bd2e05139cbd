use prometheus::{Encoder, TextEncoder};

/// Text exposition of the default registry.
///
/// Families are only listed once touched, so an idle process renders
/// an empty body.
pub fn gather_as_text() -> String {
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&families, &mut buf) {
        tracing::warn!("metrics encode failed: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
