use std::convert::Infallible;

use anyhow::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[derive(Clone)]
pub struct MetricsSvc {
    listen: String,
}

impl MetricsSvc {
    pub fn new(listen: impl Into<String>) -> Self {
        Self { listen: listen.into() }
    }

    /// Serve `/metrics` until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen)
            .await
            .with_context(|| format!("metrics bind {} failed", self.listen))?;
        tracing::info!("metrics listening on {}", self.listen);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("metrics service shutdown");
                    return Ok(());
                }
                res = listener.accept() => {
                    let (stream, _peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::warn!("metrics accept error: {}", e);
                            continue;
                        }
                    };

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(handle);
                        let builder = hyper::server::conn::http1::Builder::new();

                        if let Err(e) = builder.serve_connection(io, svc).await {
                            tracing::warn!("metrics conn error: {}", e);
                        }
                    });
                }
            }
        }
    }
}

async fn handle(req: Request<hyper::body::Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(respond(req.uri().path()))
}

pub(crate) fn respond(path: &str) -> Response<Full<Bytes>> {
    if path != "/metrics" {
        return text_response(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", "not found".into());
    }

    let body = crate::metrics::registry::gather_as_text();
    text_response(
        StatusCode::OK,
        "text/plain; version=0.0.4; charset=utf-8",
        body,
    )
}

fn text_response(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(body)));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(content_type),
    );
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_metrics_path_is_served() {
        assert_eq!(respond("/metrics").status(), StatusCode::OK);
        assert_eq!(respond("/").status(), StatusCode::NOT_FOUND);
        assert_eq!(respond("/metrics/").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn exposition_content_type() {
        let resp = respond("/metrics");
        assert_eq!(
            resp.headers()[http::header::CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }
}
