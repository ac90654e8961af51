//! HTTP adapter.
//!
//! | Route | Method | Body | Response |
//! |-------|--------|------|----------|
//! | `/` | GET | - | interactive page |
//! | `/api/methods` | GET | - | `{"methods": [..], "effects": [..]}` |
//! | `/api/process-image/` | POST | multipart `image`, `method`, `low`, `high`, `effect` | `{"processed_image": base64 PNG, "method": ..}` |
//! | `/api/score/` | POST | multipart `image`, `low`, `high` | `{"scores": [..], "best": ..}` |
//! | `/api/histogram/` | POST | same as process-image | `{"histogram": [256 counts]}` |
//! | `/healthz` | GET | - | `ok` (liveness) |
//!
//! Every API failure is answered with `400 {"error": message}`. Pixel work runs
//! on the blocking pool; handlers share no mutable state.

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::EdgeError;
use crate::normalize::normalize;
use crate::ops::{Effect, Method};
use crate::pipeline::{process_bytes, CannyThresholds, PipelineRequest};
use crate::scorer::{score, ScoreEntry};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Read `EDGESCOPE_BIND_ADDR` and `EDGESCOPE_MAX_UPLOAD_BYTES`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset, empty or unparsable values
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(addr) = lookup("EDGESCOPE_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            cfg.bind_addr = addr.trim().to_string();
        }
        if let Some(raw) = lookup("EDGESCOPE_MAX_UPLOAD_BYTES") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => cfg.max_upload_bytes = n,
                _ => warn!(value = %raw, "ignoring invalid EDGESCOPE_MAX_UPLOAD_BYTES"),
            }
        }
        cfg
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<EdgeError> for ApiError {
    fn from(err: EdgeError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self { status: err.status(), message: err.body_text() }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("processing task failed: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = self.status.as_u16(), error = %self.message, "request failed");
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ============================================================================
// Multipart form
// ============================================================================

#[derive(Debug, Default)]
struct UploadForm {
    image: Option<Vec<u8>>,
    method: Option<String>,
    low: Option<String>,
    high: Option<String>,
    effect: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => form.image = Some(field.bytes().await?.to_vec()),
                "method" => form.method = non_empty(field.text().await?),
                "low" => form.low = non_empty(field.text().await?),
                "high" => form.high = non_empty(field.text().await?),
                "effect" => form.effect = non_empty(field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }

    fn thresholds(&self) -> Result<CannyThresholds, ApiError> {
        let defaults = CannyThresholds::default();
        Ok(CannyThresholds::new(
            parse_threshold("low", self.low.as_deref(), defaults.low)?,
            parse_threshold("high", self.high.as_deref(), defaults.high)?,
        ))
    }

    fn request(&self) -> Result<PipelineRequest, ApiError> {
        let thresholds = self.thresholds()?;
        let method = self.method.as_deref().unwrap_or(Method::Canny.name());
        Ok(PipelineRequest::parse(method, thresholds.low, thresholds.high, self.effect.as_deref())?)
    }

    fn take_image(&mut self) -> Result<Vec<u8>, ApiError> {
        self.image.take().ok_or_else(|| ApiError::bad_request("missing multipart field \"image\""))
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_threshold(field: &str, raw: Option<&str>, default: u8) -> Result<u8, ApiError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse::<u8>()
            .map_err(|_| ApiError::bad_request(format!("{field} must be an integer in 0..=255, got {v:?}"))),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize)]
struct ProcessResponse {
    processed_image: String,
    method: Method,
}

#[derive(Debug, Serialize)]
struct ScoreResponse {
    scores: Vec<ScoreEntry>,
    best: Method,
}

#[derive(Debug, Serialize)]
struct HistogramResponse {
    histogram: Vec<u32>,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn list_methods() -> Json<serde_json::Value> {
    let methods: Vec<&str> = Method::ALL.iter().map(|m| m.name()).collect();
    let effects: Vec<&str> = Effect::ALL.iter().map(|e| e.name()).collect();
    Json(json!({ "methods": methods, "effects": effects }))
}

async fn process_image(multipart: Multipart) -> Result<Json<ProcessResponse>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;
    let request = form.request()?;

    info!(method = %request.method, effect = %request.effect, bytes = image.len(), "process-image");

    let png = tokio::task::spawn_blocking(move || process_bytes(&image, &request)?.result.encode_png()).await??;

    Ok(Json(ProcessResponse {
        processed_image: BASE64.encode(png),
        method: request.method,
    }))
}

async fn score_methods(multipart: Multipart) -> Result<Json<ScoreResponse>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;
    let thresholds = form.thresholds()?;

    info!(low = thresholds.low, high = thresholds.high, bytes = image.len(), "score");

    let table = tokio::task::spawn_blocking(move || {
        normalize(&image).map(|n| score(n.gray.view(), thresholds))
    })
    .await??;
    let best = table.best()?;

    Ok(Json(ScoreResponse { scores: table.ranked(), best: best.method }))
}

async fn histogram(multipart: Multipart) -> Result<Json<HistogramResponse>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;
    let request = form.request()?;

    info!(method = %request.method, effect = %request.effect, bytes = image.len(), "histogram");

    let hist = tokio::task::spawn_blocking(move || process_bytes(&image, &request).map(|p| p.result.histogram()))
        .await??;

    Ok(Json(HistogramResponse { histogram: hist.to_vec() }))
}

// ============================================================================
// Router and server
// ============================================================================

pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/methods", get(list_methods))
        .route("/api/process-image/", post(process_image))
        .route("/api/score/", post(score_methods))
        .route("/api/histogram/", post(histogram))
        .route("/healthz", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    let app = router(&config);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, max_upload_bytes = config.max_upload_bytes, "edgescope server listening");
    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Edge Detection</title>
<style>
  body { font-family: sans-serif; background: #111; color: #eee; margin: 0 auto; max-width: 880px; padding: 16px; }
  header { border: 1px solid #888; border-radius: 10px; padding: 10px; background: #222; text-align: center; }
  .row { display: flex; gap: 16px; align-items: center; flex-wrap: wrap; margin: 12px 0; }
  .pane { flex: 1; min-width: 300px; }
  img { width: 400px; max-width: 100%; background: #000; }
  table { border-collapse: collapse; }
  td, th { padding: 2px 10px; text-align: left; }
  tr.best { color: #6f6; font-weight: bold; }
  #error { color: #f66; }
</style>
</head>
<body>
<header><h3>Image Edge Detection Techniques</h3></header>

<div class="row">
  <input type="file" id="file" accept="image/png,image/jpeg,image/bmp,image/webp">
</div>
<div class="row">
  <label>Low <input type="range" id="low" min="0" max="255" value="100"> <span id="low-v">100</span></label>
  <label>High <input type="range" id="high" min="0" max="255" value="200"> <span id="high-v">200</span></label>
  <label>Method <select id="method"></select></label>
  <label>Extra effect <select id="effect"></select></label>
  <button id="score">Compare methods</button>
</div>
<div id="error"></div>

<div class="row">
  <div class="pane"><h4>Original</h4><img id="original" alt=""></div>
  <div class="pane"><h4 id="result-title">Result</h4><img id="result" alt=""></div>
</div>
<canvas id="histogram" width="400" height="120" hidden></canvas>

<div id="scores" hidden>
  <h4>Edge pixel counts</h4>
  <table><thead><tr><th>Method</th><th>Count</th><th></th></tr></thead><tbody></tbody></table>
  <p id="best"></p>
</div>

<script>
(function () {
  const $ = (id) => document.getElementById(id);
  const fileInput = $('file');

  function form(extra) {
    const fd = new FormData();
    fd.append('image', fileInput.files[0]);
    fd.append('low', $('low').value);
    fd.append('high', $('high').value);
    for (const [k, v] of Object.entries(extra || {})) fd.append(k, v);
    return fd;
  }

  async function post(url, fd) {
    const res = await fetch(url, { method: 'POST', body: fd });
    const body = await res.json();
    if (!res.ok) throw new Error(body.error || res.statusText);
    return body;
  }

  function drawHistogram(counts) {
    const canvas = $('histogram');
    const ctx = canvas.getContext('2d');
    const max = Math.max(1, ...counts);
    ctx.fillStyle = '#222';
    ctx.fillRect(0, 0, canvas.width, canvas.height);
    ctx.fillStyle = 'steelblue';
    const w = canvas.width / 256;
    counts.forEach((c, i) => {
      const h = (c / max) * canvas.height;
      ctx.fillRect(i * w, canvas.height - h, Math.max(w, 1), h);
    });
    canvas.hidden = false;
  }

  async function update() {
    if (!fileInput.files.length) return;
    $('error').textContent = '';
    const method = $('method').value;
    const effect = $('effect').value;
    $('result-title').textContent = method + ' Result';
    try {
      const body = await post('/api/process-image/', form({ method, effect }));
      $('result').src = 'data:image/png;base64,' + body.processed_image;
      if (method === 'Equalization') {
        const h = await post('/api/histogram/', form({ method, effect }));
        drawHistogram(h.histogram);
      } else {
        $('histogram').hidden = true;
      }
    } catch (e) {
      $('error').textContent = e.message;
    }
  }

  async function compare() {
    if (!fileInput.files.length) return;
    try {
      const body = await post('/api/score/', form());
      const tbody = document.querySelector('#scores tbody');
      tbody.innerHTML = '';
      const max = Math.max(1, ...body.scores.map((s) => s.count));
      for (const s of body.scores) {
        const tr = document.createElement('tr');
        if (s.method === body.best) tr.className = 'best';
        const bar = '█'.repeat(Math.round((s.count / max) * 30));
        tr.innerHTML = '<td>' + s.method + '</td><td>' + s.count + '</td><td>' + bar + '</td>';
        tbody.appendChild(tr);
      }
      $('best').textContent = 'Best method: ' + body.best;
      $('scores').hidden = false;
    } catch (e) {
      $('error').textContent = e.message;
    }
  }

  fetch('/api/methods').then((r) => r.json()).then((body) => {
    for (const m of body.methods) $('method').add(new Option(m, m, m === 'Canny', m === 'Canny'));
    for (const e of body.effects) $('effect').add(new Option(e, e));
  });

  fileInput.addEventListener('change', () => {
    if (!fileInput.files.length) return;
    $('original').src = URL.createObjectURL(fileInput.files[0]);
    update();
  });
  for (const id of ['low', 'high']) {
    $(id).addEventListener('input', () => { $(id + '-v').textContent = $(id).value; });
    $(id).addEventListener('change', update);
  }
  $('method').addEventListener('change', update);
  $('effect').addEventListener('change', update);
  $('score').addEventListener('click', compare);
})();
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use ndarray::Array3;
    use tower::ServiceExt;

    use crate::grid::PixelGrid;

    const BOUNDARY: &str = "edgescope-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, Vec<u8>),
    }

    fn multipart(parts: Vec<Part<'_>>) -> Body {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload.png\"\r\nContent-Type: image/png\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn post_request(uri: &str, parts: Vec<Part<'_>>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(multipart(parts))
            .unwrap()
    }

    async fn send(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router(&ServerConfig::default()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn split_png() -> Vec<u8> {
        let rgb = Array3::from_shape_fn((40, 80, 3), |(_, x, _)| if x < 40 { 20u8 } else { 230 });
        PixelGrid::Rgb(rgb).encode_png().unwrap()
    }

    #[test]
    fn test_config_from_lookup() {
        let cfg = ServerConfig::from_lookup(|key| match key {
            "EDGESCOPE_BIND_ADDR" => Some("0.0.0.0:9000".to_string()),
            "EDGESCOPE_MAX_UPLOAD_BYTES" => Some("1024".to_string()),
            _ => None,
        });
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.max_upload_bytes, 1024);

        let cfg = ServerConfig::from_lookup(|key| (key == "EDGESCOPE_MAX_UPLOAD_BYTES").then(|| "lots".to_string()));
        assert_eq!(cfg, ServerConfig::default());
    }

    #[tokio::test]
    async fn test_process_image_defaults_to_canny() {
        let req = post_request("/api/process-image/", vec![Part::File("image", split_png())]);

        let (status, body) = send(req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "Canny");
        let png = BASE64.decode(body["processed_image"].as_str().unwrap()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 200));
    }

    #[tokio::test]
    async fn test_process_image_with_effect() {
        let req = post_request(
            "/api/process-image/",
            vec![
                Part::File("image", split_png()),
                Part::Text("method", "None"),
                Part::Text("effect", "Invert"),
            ],
        );

        let (status, body) = send(req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "None");
    }

    #[tokio::test]
    async fn test_unknown_method_is_bad_request() {
        let req = post_request(
            "/api/process-image/",
            vec![Part::File("image", split_png()), Part::Text("method", "Foo")],
        );

        let (status, body) = send(req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Foo"));
    }

    #[tokio::test]
    async fn test_missing_image_and_bad_threshold() {
        let (status, body) = send(post_request("/api/process-image/", vec![Part::Text("method", "Sobel")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("image"));

        let req = post_request(
            "/api/process-image/",
            vec![Part::File("image", split_png()), Part::Text("low", "300")],
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("low"));
    }

    #[tokio::test]
    async fn test_oversize_aspect_ratio_is_bad_request() {
        let tall = Array3::<u8>::zeros((2000, 1, 3));
        let png = PixelGrid::Rgb(tall).encode_png().unwrap();

        for uri in ["/api/process-image/", "/api/score/"] {
            let (status, body) = send(post_request(uri, vec![Part::File("image", png.clone())])).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].as_str().unwrap().starts_with("image too tall"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_healthz() {
        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let resp = router(&ServerConfig::default()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_undecodable_upload() {
        let req = post_request("/api/process-image/", vec![Part::File("image", b"not an image".to_vec())]);
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("failed to decode image"));
    }

    #[tokio::test]
    async fn test_score_ranks_all_edge_detectors() {
        let req = post_request("/api/score/", vec![Part::File("image", split_png())]);

        let (status, body) = send(req).await;

        assert_eq!(status, StatusCode::OK);
        let scores = body["scores"].as_array().unwrap();
        assert_eq!(scores.len(), Method::EDGE_DETECTORS.len());
        assert_eq!(body["best"], scores[0]["method"]);
        let counts: Vec<u64> = scores.iter().map(|s| s["count"].as_u64().unwrap()).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_histogram_has_256_bins() {
        let req = post_request(
            "/api/histogram/",
            vec![Part::File("image", split_png()), Part::Text("method", "Equalization")],
        );

        let (status, body) = send(req).await;

        assert_eq!(status, StatusCode::OK);
        let hist = body["histogram"].as_array().unwrap();
        assert_eq!(hist.len(), 256);
        let total: u64 = hist.iter().map(|v| v.as_u64().unwrap()).sum();
        assert_eq!(total, 400 * 200);
    }

    #[tokio::test]
    async fn test_methods_listing_and_index() {
        let req = Request::builder().uri("/api/methods").body(Body::empty()).unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["methods"][0], "Equalization");
        assert_eq!(body["effects"][0], "None");

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = router(&ServerConfig::default()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(std::str::from_utf8(&html).unwrap().contains("/api/process-image/"));
    }
}
