use crate::archiver::clip::{parse_clip_filename, ClipInfo};
use crate::config::ViewerConfig;
use anyhow::Result;
use axum::body::StreamBody;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Local};
use log::info;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower_http::cors::{Any, CorsLayer};

// Shared application state
#[derive(Clone)]
struct AppState {
    videos_dir: PathBuf,
}

/// Read-only web interface over the clip archive
pub struct RestApi {
    config: ViewerConfig,
    videos_dir: PathBuf,
}

impl RestApi {
    pub fn new(config: &ViewerConfig, videos_dir: &Path) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            videos_dir: videos_dir.to_path_buf(),
        })
    }

    pub async fn run(&self) -> Result<()> {
        let state = AppState {
            videos_dir: self.videos_dir.clone(),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = Router::new()
            .route("/", get(index))
            .route("/video/:filename", get(serve_video))
            .with_state(state)
            .layer(cors);

        let addr = format!("{}:{}", self.config.address, self.config.port);
        let addr: SocketAddr = addr.parse()?;

        info!("Video viewer listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }
}

struct ClipListing {
    filename: String,
    size_mb: f64,
    modified: SystemTime,
    info: ClipInfo,
}

/// All archived clips, newest first. A clip appearing mid-scan just shows
/// up on the next page load.
fn collect_clips(videos_dir: &Path) -> Vec<ClipListing> {
    let pattern = videos_dir.join("*.mp4");
    let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };

    let mut clips: Vec<ClipListing> = paths
        .filter_map(|entry| {
            let path = entry.ok()?;
            let filename = path.file_name()?.to_string_lossy().to_string();
            let info = parse_clip_filename(&filename)?;
            let metadata = std::fs::metadata(&path).ok()?;
            Some(ClipListing {
                filename,
                size_mb: metadata.len() as f64 / (1024.0 * 1024.0),
                modified: metadata.modified().ok()?,
                info,
            })
        })
        .collect();

    // The timestamp prefix makes lexical order chronological
    clips.sort_by(|a, b| b.filename.cmp(&a.filename));
    clips
}

/// Resolve a requested clip name inside the archive directory. Anything
/// that escapes the directory resolves to None.
fn resolve_clip_path(videos_dir: &Path, filename: &str) -> Option<PathBuf> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return None;
    }

    let dir = videos_dir.canonicalize().ok()?;
    let resolved = dir.join(filename).canonicalize().ok()?;
    if resolved.is_file() && resolved.starts_with(&dir) {
        Some(resolved)
    } else {
        None
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn format_day(time: SystemTime) -> String {
    let time: DateTime<Local> = time.into();
    time.format("%m/%d/%Y").to_string()
}

const PAGE_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; max-width: 1200px; margin: 0 auto;
               padding: 20px; background-color: #f5f5f5; }
        h1 { color: #333; text-align: center; }
        .stats { background: white; padding: 15px; border-radius: 8px;
                 margin-bottom: 20px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        .video-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(300px, 1fr));
                      gap: 20px; }
        .video-card { background: white; border-radius: 8px; padding: 15px;
                      box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        video { width: 100%; border-radius: 4px; background: black; }
        .video-info { margin-top: 10px; }
        .video-title { font-weight: bold; color: #333; margin-bottom: 5px; }
        .video-meta { font-size: 0.9em; color: #666; }
        .download-btn { display: inline-block; margin-top: 10px; padding: 8px 16px;
                        background: #007bff; color: white; text-decoration: none;
                        border-radius: 4px; font-size: 0.9em; }
        .download-btn:hover { background: #0056b3; }
        .no-videos { text-align: center; padding: 40px; color: #666; }
"#;

async fn index(State(state): State<AppState>) -> Html<String> {
    let clips = collect_clips(&state.videos_dir);

    let total_size_mb: f64 = clips.iter().map(|c| c.size_mb).sum();
    let oldest = clips
        .iter()
        .map(|c| c.modified)
        .min()
        .map(format_day)
        .unwrap_or_else(|| "N/A".to_string());
    let newest = clips
        .iter()
        .map(|c| c.modified)
        .max()
        .map(format_day)
        .unwrap_or_else(|| "N/A".to_string());

    let body = if clips.is_empty() {
        r#"<div class="no-videos">
        <h2>No videos found</h2>
        <p>Videos will appear here once doorbell events are recorded.</p>
    </div>"#
            .to_string()
    } else {
        let cards: String = clips
            .iter()
            .map(|clip| {
                format!(
                    r#"<div class="video-card">
            <video controls preload="metadata">
                <source src="/video/{filename}" type="video/mp4">
                Your browser doesn't support video playback.
            </video>
            <div class="video-info">
                <div class="video-title">{device}</div>
                <div class="video-meta">
                    {kind} | {date}<br>
                    {time} | {size:.2} MB
                </div>
                <a href="/video/{filename}" download class="download-btn">Download</a>
            </div>
        </div>"#,
                    filename = clip.filename,
                    device = escape_html(&clip.info.device),
                    kind = escape_html(&clip.info.kind),
                    date = clip.info.date,
                    time = clip.info.time,
                    size = clip.size_mb,
                )
            })
            .collect();
        format!(r#"<div class="video-grid">{}</div>"#, cards)
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Ring Video Archive</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>{style}</style>
</head>
<body>
    <h1>Ring Video Archive</h1>
    <div class="stats">
        <strong>Total Videos:</strong> {count} |
        <strong>Total Size:</strong> {size:.2} MB |
        <strong>Oldest:</strong> {oldest} |
        <strong>Newest:</strong> {newest}
    </div>
    {body}
</body>
</html>"#,
        style = PAGE_STYLE,
        count = clips.len(),
        size = total_size_mb,
        oldest = oldest,
        newest = newest,
        body = body,
    ))
}

async fn serve_video(
    UrlPath(filename): UrlPath<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(path) = resolve_clip_path(&state.videos_dir, &filename) else {
        return (StatusCode::NOT_FOUND, "Video not found").into_response();
    };

    match tokio::fs::File::open(&path).await {
        Ok(file) => {
            let stream = ReaderStream::new(file);
            let body = StreamBody::new(stream);

            let headers = HeaderMap::from_iter([
                (header::CONTENT_TYPE, "video/mp4".parse().unwrap()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("inline; filename=\"{}\"", filename).parse().unwrap(),
                ),
            ]);

            (StatusCode::OK, headers, body).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Video not found").into_response(),
    }
}
