// HTTP/1.1 transport adapter over hyper

use crate::registry::Router;
use crate::{HttpRequest, HttpResponse};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serves a [`Router`] over plain HTTP/1.1.
pub struct Server {
    router: Arc<Router>,
}

impl Server {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Bind every interface on `port` and serve forever.
    pub async fn listen(self, port: u16) -> io::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections accepted from `listener`, one task per connection.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        lintel_log::info!("listening on http://{}", listener.local_addr()?);

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = Arc::clone(&self.router);

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let router = Arc::clone(&router);
                    async move { handle_request(req, router).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    lintel_log::debug!("connection from {} ended with error: {:?}", peer, err);
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    router: Arc<Router>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let request = read_request(req).await?;
    let response = router.dispatch(request).await;
    Ok(into_response(response))
}

/// Convert a hyper request, joining repeated header values with `, `.
pub async fn read_request<B: Body>(req: Request<B>) -> Result<HttpRequest, B::Error> {
    let (parts, body) = req.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut request = HttpRequest::new(parts.method.as_str(), target);
    for (name, value) in &parts.headers {
        let Ok(value) = value.to_str() else {
            lintel_log::debug!("dropping non-ASCII header `{}`", name);
            continue;
        };
        request
            .headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    request.body = body.collect().await?.to_bytes().to_vec();
    Ok(request)
}

/// Convert a response, keeping repeated headers as separate lines.
pub fn into_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    match builder.body(Full::new(Bytes::from(response.body))) {
        Ok(response) => response,
        Err(err) => {
            lintel_log::error!("malformed response dropped: {}", err);
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }
    }
}
