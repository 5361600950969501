use axum::{
    body::{Body, to_bytes},
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use crate::error::CauseLogged;

// 错误响应体很短，超出说明响应本身有问题
const MAX_LOGGED_BODY: usize = 1024;

/// 记录 5xx 响应的请求路径、状态码和响应体
///
/// 带 `CauseLogged` 标记的响应已记录过原因，只输出 debug 日志
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            parts.headers.remove(header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let body = String::from_utf8_lossy(&bytes);
    if parts.extensions.get::<CauseLogged>().is_some() {
        debug!(%method, %uri, status = %parts.status, %body, "server error response");
    } else {
        error!(%method, %uri, status = %parts.status, %body, "server error response");
    }

    // 重置body以便重新构建响应
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
