//! Form-based HTTP surface: submit a video or URL, get links to the original and dubbed video.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::{Result, RevoiceError};
use crate::language::LanguageCode;
use crate::source::VideoSource;
use crate::workflow::{JobRequest, JobSummary, Workflow};

/// Multipart overhead allowed on top of the upload size limit
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

pub struct AppState {
    workflow: Workflow,
    /// Jobs run one at a time
    job_lock: Mutex<()>,
}

impl AppState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            job_lock: Mutex::new(()),
        }
    }
}

/// Fields of the submission form
#[derive(Debug, Default)]
pub struct JobForm {
    pub video: Option<(String, Bytes)>,
    pub video_url: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

impl JobForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = JobForm::default();

        while let Some(field) = multipart.next_field().await
            .map_err(|e| RevoiceError::Validation(format!("Malformed form data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "video" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await
                        .map_err(|e| RevoiceError::Validation(format!("Failed to read uploaded video: {}", e)))?;
                    if !file_name.is_empty() || !data.is_empty() {
                        form.video = Some((file_name, data));
                    }
                }
                "video_url" | "source_language" | "target_language" => {
                    let value = field.text().await
                        .map_err(|e| RevoiceError::Validation(format!("Failed to read field {}: {}", name, e)))?;
                    let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                    match name.as_str() {
                        "video_url" => form.video_url = value,
                        "source_language" => form.source_language = value,
                        _ => form.target_language = value,
                    }
                }
                other => warn!("Ignoring unexpected form field '{}'", other),
            }
        }

        Ok(form)
    }

    /// Validate the form into a job request; an uploaded file wins over a URL
    pub fn into_request(self) -> Result<JobRequest> {
        let target_language = self
            .target_language
            .ok_or_else(|| RevoiceError::Validation("Target language is required".to_string()))
            .and_then(|code| LanguageCode::parse(&code))?;

        let source_language = self
            .source_language
            .map(|code| LanguageCode::parse(&code))
            .transpose()?;

        let source = match (self.video, self.video_url) {
            (Some((file_name, data)), _) => VideoSource::Upload { file_name, data },
            (None, Some(url)) => VideoSource::Url(url),
            (None, None) => {
                return Err(RevoiceError::Validation(
                    "Upload a video file or provide a video URL".to_string(),
                ));
            }
        };

        Ok(JobRequest {
            source,
            source_language,
            target_language,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let storage = &state.workflow.config().storage;
    let body_limit = state.workflow.config().upload.max_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(index).post(submit))
        .nest_service("/uploads", ServeDir::new(&storage.upload_dir))
        .nest_service("/output", ServeDir::new(&storage.output_dir))
        .layer(DefaultBodyLimit::max(usize::try_from(body_limit).unwrap_or(usize::MAX)))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(workflow: Workflow, bind_address: &str) -> Result<()> {
    let storage = workflow.config().storage.clone();
    tokio::fs::create_dir_all(&storage.upload_dir).await?;
    tokio::fs::create_dir_all(&storage.output_dir).await?;

    let app = router(Arc::new(AppState::new(workflow)));
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<String> {
    Html(render_page(None))
}

async fn submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> (StatusCode, Html<String>) {
    let request = match JobForm::from_multipart(multipart).await.and_then(JobForm::into_request) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected submission: {}", e);
            return (StatusCode::BAD_REQUEST, Html(render_page(Some(Err(e.to_string())))));
        }
    };

    let _guard = state.job_lock.lock().await;
    match state.workflow.run(request).await {
        Ok(summary) => {
            let body = render_summary(&summary, &state.workflow.config().storage);
            (StatusCode::OK, Html(render_page(Some(Ok(body)))))
        }
        Err(failure) => {
            let status = if failure.error.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let message = format!("{}: {}", failure.error.kind(), failure.error);
            (status, Html(render_page(Some(Err(message)))))
        }
    }
}

/// URL path under which `path` is served, if it lies inside `root`
pub fn public_link(prefix: &str, root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut link = prefix.trim_end_matches('/').to_string();
    for component in relative.components() {
        link.push('/');
        link.push_str(&component.as_os_str().to_string_lossy());
    }
    Some(link)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_summary(summary: &JobSummary, storage: &StorageConfig) -> String {
    let mut html = String::new();

    if let Some(link) = public_link("/uploads", &storage.upload_dir, &summary.original_video) {
        let _ = write!(
            html,
            "<h2>Original video</h2>\n<video controls src=\"{0}\"></video>\n<p><a href=\"{0}\">{0}</a></p>\n",
            escape_html(&link)
        );
    }
    if let Some(link) = public_link("/output", &storage.output_dir, &summary.translated_video) {
        let _ = write!(
            html,
            "<h2>Translated video</h2>\n<video controls src=\"{0}\"></video>\n<p><a href=\"{0}\">{0}</a></p>\n",
            escape_html(&link)
        );
    }

    let source = summary
        .source_language
        .as_ref()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "auto".to_string());
    let _ = write!(
        html,
        "<h3>Transcript ({})</h3>\n<p>{}</p>\n<h3>Translation ({})</h3>\n<p>{}</p>\n",
        escape_html(&source),
        escape_html(&summary.transcript),
        escape_html(summary.target_language.as_str()),
        escape_html(&summary.translated_text)
    );

    let dropped = summary.sync.dropped_seconds();
    if dropped > 0.0 {
        let _ = write!(
            html,
            "<p class=\"warning\">The translated speech was {:.1}s longer than the video; the end was cut off.</p>\n",
            dropped
        );
    }

    html
}

fn render_page(result: Option<std::result::Result<String, String>>) -> String {
    let result_html = match result {
        None => String::new(),
        Some(Ok(body)) => format!("<section class=\"result\">\n{}</section>\n", body),
        Some(Err(message)) => format!("<p class=\"error\">Error: {}</p>\n", escape_html(&message)),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>revoice</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
label {{ display: block; margin-top: 0.75rem; }}
video {{ max-width: 100%; }}
.error {{ color: #b00020; }}
.warning {{ color: #8a6d00; }}
</style>
</head>
<body>
<h1>Translate a video</h1>
<form method="post" enctype="multipart/form-data">
<label>Video file <input type="file" name="video" accept=".mp4,.avi,.mov,.wmv"></label>
<label>or video URL <input type="url" name="video_url" placeholder="https://"></label>
<label>Source language (optional) <input type="text" name="source_language" placeholder="en"></label>
<label>Target language <input type="text" name="target_language" placeholder="hi" required></label>
<p><button type="submit">Translate</button></p>
</form>
{}</body>
</html>
"#,
        result_html
    )
}
