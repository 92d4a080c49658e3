use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::debug;

pub struct LoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        debug!(method = %req.method(), url = %req.url(), "upstream request");
        let res = next.run(req, extensions).await;
        match res {
            Ok(ref res) => {
                debug!(status = %res.status(), "upstream response");
            }
            Err(ref e) => {
                debug!(error = %e, "upstream request failed");
            }
        }
        res
    }
}
