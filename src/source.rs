//! Acquisition of the source video: uploads, local files and URL downloads.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{DownloadConfig, DownloadMode, UploadConfig};
use crate::error::{Result, RevoiceError};

/// Base name used when a download does not reveal a usable file name
const DOWNLOAD_STEM: &str = "downloaded_video";

/// Where a job's video comes from
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// A file already on disk (command line use)
    LocalFile(PathBuf),
    /// A file received through the HTTP form
    Upload { file_name: String, data: Bytes },
    /// A remote video to download
    Url(String),
}

impl VideoSource {
    pub fn describe(&self) -> String {
        match self {
            Self::LocalFile(path) => format!("file {}", path.display()),
            Self::Upload { file_name, data } => format!("upload {} ({} bytes)", file_name, data.len()),
            Self::Url(url) => format!("url {}", url),
        }
    }
}

/// Constraints on directly provided videos
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    max_bytes: u64,
}

impl UploadPolicy {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            max_bytes: config.max_bytes,
        }
    }

    /// Check the extension and return a file name that is safe to store
    pub fn validate_file_name(&self, file_name: &str) -> Result<String> {
        let sanitized = sanitize_file_name(file_name)
            .ok_or_else(|| RevoiceError::Validation("No video file selected".to_string()))?;

        let extension = Path::new(&sanitized)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if !self.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            return Err(RevoiceError::Validation(format!(
                "File type '{}' is not allowed (allowed: {})",
                if extension.is_empty() { "none" } else { extension.as_str() },
                self.allowed_extensions.join(", ")
            )));
        }

        Ok(sanitized)
    }

    pub fn validate_size(&self, len: u64) -> Result<()> {
        if len == 0 {
            return Err(RevoiceError::Validation("Uploaded video is empty".to_string()));
        }
        if len > self.max_bytes {
            return Err(RevoiceError::Validation(format!(
                "Video is {} bytes, the limit is {} bytes",
                len, self.max_bytes
            )));
        }
        Ok(())
    }
}

/// Reduce a client-supplied name to its last component with a safe character set
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned)
    }
}

/// Validate a user-supplied URL before handing it to a downloader
pub fn parse_video_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RevoiceError::Validation("Video URL is empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| RevoiceError::Validation(format!("Invalid video URL '{}': {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RevoiceError::Validation(format!("Unsupported URL scheme '{}'", other))),
    }
}

/// Fetches a remote video into a local directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest_dir`, returning the local file path
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Factory for creating downloader instances
pub struct DownloaderFactory;

impl DownloaderFactory {
    pub fn create_downloader(config: DownloadConfig) -> Result<Box<dyn Downloader>> {
        match config.mode {
            DownloadMode::Http => Ok(Box::new(HttpDownloader::new(config)?)),
            DownloadMode::YtDlp => Ok(Box::new(YtDlpDownloader::new(config))),
        }
    }
}

/// Place the job's source video on disk and return its path
pub async fn acquire(
    source: &VideoSource,
    policy: &UploadPolicy,
    downloader: &dyn Downloader,
    dest_dir: &Path,
) -> Result<PathBuf> {
    match source {
        VideoSource::LocalFile(path) => {
            if !path.is_file() {
                return Err(RevoiceError::FileNotFound(path.display().to_string()));
            }
            let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            policy.validate_file_name(&name)?;
            Ok(path.clone())
        }
        VideoSource::Upload { file_name, data } => {
            let file_name = policy.validate_file_name(file_name)?;
            policy.validate_size(data.len() as u64)?;

            let path = dest_dir.join(file_name);
            tokio::fs::write(&path, data).await?;
            info!("Stored uploaded video at {}", path.display());
            Ok(path)
        }
        VideoSource::Url(url) => {
            let url = parse_video_url(url)?;
            let path = downloader.download(url.as_str(), dest_dir).await?;
            if !path.is_file() {
                return Err(RevoiceError::Download(format!(
                    "Downloader reported {} but no file exists",
                    path.display()
                )));
            }
            Ok(path)
        }
    }
}

/// Direct HTTP(S) download of a video file
pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
}

impl HttpDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("revoice/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    fn file_name_for(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| u.path_segments().and_then(|mut s| s.next_back()).map(str::to_string))
            .and_then(|segment| sanitize_file_name(&segment))
            .filter(|name| Path::new(name).extension().is_some())
            .unwrap_or_else(|| format!("{}.mp4", DOWNLOAD_STEM))
    }

    async fn fetch(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await
            .map_err(|e| RevoiceError::Download(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(RevoiceError::Download(format!("{} returned HTTP {}", url, response.status())));
        }

        let content_length = response.content_length();
        if let (Some(len), Some(max)) = (content_length, self.config.max_bytes) {
            if len > max {
                return Err(RevoiceError::Download(format!(
                    "Remote video is {} bytes, the limit is {} bytes", len, max
                )));
            }
        }

        let pb = ProgressBar::new(content_length.unwrap_or(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| RevoiceError::Download(format!("Transfer from {} failed: {}", url, e)))?;
            downloaded += chunk.len() as u64;
            if let Some(max) = self.config.max_bytes {
                if downloaded > max {
                    return Err(RevoiceError::Download(format!(
                        "Remote video exceeds the limit of {} bytes", max
                    )));
                }
            }
            file.write_all(&chunk).await?;
            pb.set_position(downloaded);
        }

        file.flush().await?;
        pb.finish_and_clear();
        Ok(downloaded)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let path = dest_dir.join(Self::file_name_for(url));
        info!("Downloading {} to {}", url, path.display());

        match self.fetch(url, &path).await {
            Ok(0) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(RevoiceError::Download(format!("{} returned an empty body", url)))
            }
            Ok(bytes) => {
                info!("Downloaded {} bytes", bytes);
                Ok(path)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    debug!("No partial download to remove: {}", remove_err);
                }
                Err(e)
            }
        }
    }
}

/// Download through yt-dlp, which also understands video pages
pub struct YtDlpDownloader {
    config: DownloadConfig,
}

impl YtDlpDownloader {
    pub fn new(config: DownloadConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        info!("Downloading {} with yt-dlp", url);

        let template = dest_dir.join(format!("{}.%(ext)s", DOWNLOAD_STEM));
        let mut cmd = Command::new(&self.config.ytdlp_binary_path);
        cmd.arg("--no-playlist")
            .arg("--no-progress")
            .arg("-f").arg("mp4/bestvideo+bestaudio/best")
            .arg("--merge-output-format").arg("mp4")
            .arg("-o").arg(&template)
            .arg("--print").arg("after_move:filepath");
        if let Some(max) = self.config.max_bytes {
            cmd.arg("--max-filesize").arg(max.to_string());
        }
        cmd.arg(url);

        debug!("Executing yt-dlp command: {:?}", cmd);

        let output = cmd.output().await
            .map_err(|e| RevoiceError::Download(format!("Failed to execute {}: {}", self.config.ytdlp_binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RevoiceError::Download(format!("yt-dlp failed: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| {
                warn!("yt-dlp printed no output path for {}", url);
                RevoiceError::Download(format!("yt-dlp downloaded nothing for {}", url))
            })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UploadPolicy {
        UploadPolicy::new(&UploadConfig::default())
    }

    #[test]
    fn test_allowed_extensions_are_case_insensitive() {
        assert_eq!(policy().validate_file_name("Holiday.MOV").unwrap(), "Holiday.MOV");
        assert!(policy().validate_file_name("clip.wmv").is_ok());
    }

    #[test]
    fn test_disallowed_extension_is_validation_error() {
        for name in ["clip.mkv", "notes.txt", "noextension", ""] {
            assert!(matches!(policy().validate_file_name(name), Err(RevoiceError::Validation(_))), "{}", name);
        }
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd.mp4").as_deref(), Some("passwd.mp4"));
        assert_eq!(sanitize_file_name("C:\\Users\\me\\my clip.mp4").as_deref(), Some("my_clip.mp4"));
        assert_eq!(sanitize_file_name("..."), None);
    }

    #[test]
    fn test_size_limit() {
        let policy = UploadPolicy::new(&UploadConfig {
            max_bytes: 10,
            ..UploadConfig::default()
        });
        assert!(policy.validate_size(10).is_ok());
        assert!(policy.validate_size(11).is_err());
        assert!(policy.validate_size(0).is_err());
    }

    #[test]
    fn test_parse_video_url() {
        assert!(parse_video_url("https://example.com/v.mp4").is_ok());
        assert!(matches!(parse_video_url("   "), Err(RevoiceError::Validation(_))));
        assert!(matches!(parse_video_url("ftp://example.com/v.mp4"), Err(RevoiceError::Validation(_))));
        assert!(matches!(parse_video_url("not a url"), Err(RevoiceError::Validation(_))));
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(HttpDownloader::file_name_for("https://cdn.example.com/a/talk.mp4?sig=1"), "talk.mp4");
        assert_eq!(HttpDownloader::file_name_for("https://example.com/watch"), "downloaded_video.mp4");
        assert_eq!(HttpDownloader::file_name_for("https://example.com/"), "downloaded_video.mp4");
    }

    #[tokio::test]
    async fn test_upload_is_stored_under_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = VideoSource::Upload {
            file_name: "../escape.mp4".to_string(),
            data: Bytes::from_static(b"fake video"),
        };
        let downloader = MockDownloader::new();

        let path = acquire(&source, &policy(), &downloader, dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("escape.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake video");
    }

    #[tokio::test]
    async fn test_url_source_uses_downloader() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloader = MockDownloader::new();
        downloader
            .expect_download()
            .withf(|url, _| url.ends_with("example.com/v.mp4"))
            .times(1)
            .returning(|_, dest| {
                let path = dest.join("v.mp4");
                std::fs::write(&path, b"video").unwrap();
                Ok(path)
            });

        let source = VideoSource::Url(" https://example.com/v.mp4 ".to_string());
        let path = acquire(&source, &policy(), &downloader, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("v.mp4"));
    }

    #[test]
    fn test_download_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloader = MockDownloader::new();
        downloader
            .expect_download()
            .returning(|url, _| Err(RevoiceError::Download(format!("{} returned HTTP 404", url))));

        let source = VideoSource::Url("https://example.com/missing.mp4".to_string());
        let result = tokio_test::block_on(acquire(&source, &policy(), &downloader, dir.path()));
        assert!(matches!(result, Err(RevoiceError::Download(_))));
    }

    #[test]
    fn test_empty_url_never_reaches_downloader() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloader = MockDownloader::new();
        downloader.expect_download().times(0);

        let source = VideoSource::Url(String::new());
        let result = tokio_test::block_on(acquire(&source, &policy(), &downloader, dir.path()));
        assert!(matches!(result, Err(RevoiceError::Validation(_))));
    }

    #[test]
    fn test_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = VideoSource::LocalFile(dir.path().join("absent.mp4"));
        let result = tokio_test::block_on(acquire(&source, &policy(), &MockDownloader::new(), dir.path()));
        assert!(matches!(result, Err(RevoiceError::FileNotFound(_))));
    }
}
