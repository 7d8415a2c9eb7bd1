//! Static-S3
//!
//! Publishes a web application's static assets (CSS, JS, images) to an S3
//! bucket and rewrites asset URLs to point at the bucket instead of the
//! local server.
//!
//! ```text
//!  static folders ──► assets::walk ──► SyncEngine ──► RemoteStore (S3)
//!                                          ▲
//!                              confirm / dry-run / clear
//!
//!  template url_for ──► UrlRewriter ──► native builder (actix / RouteTable)
//! ```

pub mod assets;
pub mod config;
pub mod domain;
pub mod storage;
pub mod sync;
pub mod urls;
pub mod web;
