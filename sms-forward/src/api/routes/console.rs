//! Browser console.
//!
//! Static pages that talk to the JSON API with the `X-Auth-Secret` header.
//! The console directory holds `index.html`, `login.html`,
//! `conversation.html` and a `static/` folder for scripts and styles.

use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

/// Create the console router serving pages and assets from `dir`.
pub fn router(dir: &Path) -> Router {
    let page = |name: &str| ServeFile::new(dir.join(name));

    Router::new()
        .route_service("/", page("index.html"))
        .route_service("/login", page("login.html"))
        .route_service("/conversation/{number}", page("conversation.html"))
        .nest_service("/static", ServeDir::new(dir.join("static")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn status_of(router: &Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_serves_pages_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>home</html>").unwrap();
        std::fs::write(dir.path().join("conversation.html"), "<html>thread</html>").unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/app.js"), "'use strict';").unwrap();

        let router = router(dir.path());
        assert_eq!(status_of(&router, "/").await, StatusCode::OK);
        assert_eq!(status_of(&router, "/conversation/10010").await, StatusCode::OK);
        assert_eq!(status_of(&router, "/static/app.js").await, StatusCode::OK);
        assert_eq!(status_of(&router, "/static/missing.js").await, StatusCode::NOT_FOUND);
        // login.html was never written
        assert_eq!(status_of(&router, "/login").await, StatusCode::NOT_FOUND);
    }
}
