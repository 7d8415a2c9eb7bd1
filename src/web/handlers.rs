//! HTTP request handlers

use actix_web::{error, web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::warn;

use crate::assets::{self, EnumerateError};
use crate::domain::{content_type_for, MountSet};
use crate::urls::{UrlError, UrlParams};

use super::{StaticRoot, WebState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mounts: usize,
    pub remote_urls: bool,
}

/// GET /health - Health check endpoint
pub async fn health_check(state: web::Data<WebState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        mounts: state.mounts.len(),
        remote_urls: state.rewriter.is_enabled(),
    })
}

/// One published asset and the URL templates would link to
#[derive(Debug, Serialize)]
pub struct AssetEntry {
    pub endpoint: String,
    pub filename: String,
    pub remote_key: String,
    pub url: String,
}

/// GET /assets - Every local asset with its resolved URL
pub async fn list_assets(
    req: HttpRequest,
    state: web::Data<WebState>,
) -> Result<HttpResponse, actix_web::Error> {
    let mounts = state.mounts.clone();
    let found = web::block(move || enumerate(&mounts))
        .await?
        .map_err(error::ErrorInternalServerError)?;

    let entries = found
        .into_iter()
        .map(|(endpoint, filename, remote_key)| -> Result<AssetEntry, UrlError> {
            let url = state
                .rewriter
                .resolve(&req, &endpoint, &UrlParams::filename(filename.as_str()))?;
            Ok(AssetEntry {
                endpoint,
                filename,
                remote_key,
                url,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(entries))
}

/// (endpoint, filename, remote key) for every asset of every mount
fn enumerate(mounts: &MountSet) -> Result<Vec<(String, String, String)>, EnumerateError> {
    let mut found = Vec::new();
    for mount in mounts {
        for record in assets::walk_mount(mount) {
            let record = record?;
            if let Some(filename) = mount.filename_for(&record.remote_key) {
                found.push((mount.endpoint.clone(), filename.to_string(), record.remote_key.clone()));
            }
        }
    }
    Ok(found)
}

/// GET {url_prefix}/{filename} - Serve a file from a static mount
pub async fn serve_asset(root: web::Data<StaticRoot>, filename: web::Path<String>) -> HttpResponse {
    let Some(path) = root.resolve(&filename) else {
        return HttpResponse::NotFound().finish();
    };
    if !path.is_file() {
        return HttpResponse::NotFound().finish();
    }

    match tokio::fs::read(&path).await {
        Ok(data) => HttpResponse::Ok()
            .content_type(content_type_for(&path))
            .body(data),
        Err(e) => {
            warn!(path = %path.display(), "Failed to read static file: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::domain::MountPoint;
    use crate::urls::UrlRewriter;
    use crate::web::configure;
    use actix_web::{http::header, test, App};
    use serde_json::Value;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, MountSet) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/main.css"), "body{}").unwrap();
        let mounts = MountSet::new(vec![
            MountPoint::app(Some(dir.path().to_path_buf()), "/static"),
            MountPoint::plugin("admin", None, Some("/admin"), "/static"),
        ]);
        (dir, mounts)
    }

    fn state(mounts: &MountSet, remote: bool) -> web::Data<WebState> {
        let config = SyncConfig {
            bucket_name: "assets".to_string(),
            bucket_domain: "s3.amazonaws.com".to_string(),
            enable_remote_urls: remote,
        };
        web::Data::new(WebState::new(mounts.clone(), UrlRewriter::new(config, mounts)))
    }

    #[actix_web::test]
    async fn test_serves_files_from_mount() {
        let (_dir, mounts) = fixture();
        let app = test::init_service(
            App::new()
                .app_data(state(&mounts, false))
                .configure(|cfg| configure(cfg, &mounts)),
        )
        .await;

        let req = test::TestRequest::get().uri("/static/css/main.css").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap(),
            "text/css"
        );
        assert_eq!(test::read_body(resp).await, "body{}");

        let req = test::TestRequest::get().uri("/static/css/missing.css").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let req = test::TestRequest::get().uri("/static/css").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_health() {
        let (_dir, mounts) = fixture();
        let app = test::init_service(
            App::new()
                .app_data(state(&mounts, true))
                .configure(|cfg| configure(cfg, &mounts)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["mounts"], 2);
        assert_eq!(body["remote_urls"], true);
    }

    #[actix_web::test]
    async fn test_asset_listing_uses_native_urls_when_disabled() {
        let (_dir, mounts) = fixture();
        let app = test::init_service(
            App::new()
                .app_data(state(&mounts, false))
                .configure(|cfg| configure(cfg, &mounts)),
        )
        .await;

        let req = test::TestRequest::get().uri("/assets").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["remote_key"], "/static/css/main.css");

        let url = entries[0]["url"].as_str().unwrap();
        assert!(url.starts_with("http://"));
        assert!(url.ends_with("/static/css/main.css"));
    }

    #[actix_web::test]
    async fn test_asset_listing_points_at_bucket_when_enabled() {
        let (_dir, mounts) = fixture();
        let app = test::init_service(
            App::new()
                .app_data(state(&mounts, true))
                .configure(|cfg| configure(cfg, &mounts)),
        )
        .await;

        let req = test::TestRequest::get().uri("/assets").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body[0]["url"],
            "//s3.amazonaws.com/assets/static/css/main.css"
        );
        assert_eq!(body[0]["endpoint"], "static");
        assert_eq!(body[0]["filename"], "css/main.css");
    }
}
