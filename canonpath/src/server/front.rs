use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use http::{header, HeaderValue, Method, StatusCode, Uri};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::metrics::counters;
use crate::path::decision::{is_pathless, Decision, RedirectPolicy};

static REQ_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

fn gen_request_id() -> String {
    let n = REQ_COUNTER.fetch_add(1, Ordering::Relaxed);
    let ts = Utc::now().timestamp_millis();
    format!("req-{}-{:x}", ts, n)
}

/// Answers every request with its routing key, or with a redirect to the
/// canonical location when the request path is not canonical.
#[derive(Clone)]
pub struct FrontSvc {
    listen: String,
    policy: Arc<RedirectPolicy>,
}

impl FrontSvc {
    pub fn new(listen: impl Into<String>, policy: RedirectPolicy) -> Self {
        Self {
            listen: listen.into(),
            policy: Arc::new(policy),
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen)
            .await
            .with_context(|| format!("front bind {} failed", self.listen))?;
        tracing::info!("front listening on {}", self.listen);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("front service shutdown");
                    return Ok(());
                }
                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::warn!("front accept error: {}", e);
                            continue;
                        }
                    };

                    let policy = self.policy.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req: Request<hyper::body::Incoming>| {
                            let policy = policy.clone();
                            async move {
                                Ok::<_, Infallible>(respond(&policy, req.method(), req.uri()))
                            }
                        });
                        let builder = hyper::server::conn::http1::Builder::new();

                        if let Err(e) = builder.serve_connection(io, svc).await {
                            tracing::warn!("front conn error peer={} err={}", peer, e);
                        }
                    });
                }
            }
        }
    }
}

pub fn respond(policy: &RedirectPolicy, method: &Method, uri: &Uri) -> Response<Full<Bytes>> {
    let request_id = gen_request_id();
    let decision = policy.decide(method, uri);
    if !is_pathless(uri) {
        let canonical = matches!(&decision, Decision::Forward { path } if path == uri.path());
        counters::on_path("http", uri.path().len(), canonical);
    }

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        raw = uri.path(),
        decision = decision.kind_str(),
        "request path"
    );

    let mut resp = match decision {
        Decision::Forward { path } => {
            let key = HeaderValue::from_str(&path).ok();
            let mut resp = Response::new(Full::new(Bytes::from(path)));
            if let Some(key) = key {
                resp.headers_mut().insert("x-canonical-path", key);
            }
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            resp
        }
        Decision::Redirect { status, location } => {
            counters::inc_redirect(status);
            let mut resp = Response::new(Full::new(Bytes::new()));
            *resp.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::MOVED_PERMANENTLY);
            match HeaderValue::from_str(&location) {
                Ok(v) => {
                    resp.headers_mut().insert(header::LOCATION, v);
                }
                Err(e) => {
                    tracing::warn!("bad location {:?}: {}", location, e);
                    *resp.status_mut() = StatusCode::BAD_REQUEST;
                }
            }
            resp
        }
    };

    if let Ok(v) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert("x-request-id", v);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn redirects_non_canonical_get() {
        let resp = respond(&RedirectPolicy::default(), &Method::GET, &uri("/a//b/./c/?x=1"));
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[header::LOCATION], "/a/b/c/?x=1");
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[test]
    fn redirects_non_canonical_put_with_308() {
        let resp = respond(&RedirectPolicy::default(), &Method::PUT, &uri("/../x"));
        assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(resp.headers()[header::LOCATION], "/x");
    }

    #[tokio::test]
    async fn forwards_canonical_path() {
        let resp = respond(&RedirectPolicy::default(), &Method::GET, &uri("/abc/def"));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-canonical-path"], "/abc/def");

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/abc/def");
    }

    #[tokio::test]
    async fn authority_form_connect_is_forwarded_untouched() {
        let resp = respond(&RedirectPolicy::default(), &Method::CONNECT, &uri("example.com:443"));
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::LOCATION).is_none());
        assert_eq!(resp.headers()["x-canonical-path"], "");

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(gen_request_id(), gen_request_id());
    }
}
