//! Image loading for capture targets.
//!
//! Sources may be data URLs, http(s) URLs or local paths. Each load runs on
//! the blocking pool and is bounded by the capture's image timeout.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use image::RgbaImage;

use crate::error::CaptureError;

/// Decoded images keyed by their markup `src`. Failed loads are absent.
#[derive(Debug, Default, Clone)]
pub struct ImageSet {
    images: HashMap<String, RgbaImage>,
}

impl ImageSet {
    pub fn get(&self, src: &str) -> Option<&RgbaImage> {
        self.images.get(src)
    }

    pub fn insert(&mut self, src: String, image: RgbaImage) {
        self.images.insert(src, image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Which image sources a capture may read. Data URLs are always allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ImagePolicy {
    /// Any file path or http(s) URL.
    #[default]
    Unrestricted,
    /// Files under one of `roots` and URLs whose host is one of `hosts`.
    Restricted { roots: Vec<PathBuf>, hosts: Vec<String> },
}

impl ImagePolicy {
    pub fn data_urls_only() -> Self {
        ImagePolicy::Restricted { roots: Vec::new(), hosts: Vec::new() }
    }

    pub fn permits(&self, src: &str) -> bool {
        let (roots, hosts) = match self {
            ImagePolicy::Unrestricted => return true,
            ImagePolicy::Restricted { roots, hosts } => (roots, hosts),
        };
        match source_kind(src) {
            "data-url" => true,
            "remote" => url_host(src).is_some_and(|host| hosts.iter().any(|h| h.eq_ignore_ascii_case(host))),
            _ => under_any_root(Path::new(src), roots),
        }
    }
}

fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = match host_port.strip_prefix('[') {
        Some(v6) => v6.split(']').next()?,
        None => host_port.split(':').next()?,
    };
    (!host.is_empty()).then_some(host)
}

// Canonicalized so `..` and symlinks cannot step outside a root
fn under_any_root(path: &Path, roots: &[PathBuf]) -> bool {
    let Ok(path) = path.canonicalize() else {
        return false;
    };
    roots
        .iter()
        .filter_map(|root| root.canonicalize().ok())
        .any(|root| path.starts_with(root))
}

/// Load every source, failing the capture if any load outlives `timeout`.
///
/// Sources that fail to load or decode, or that `policy` does not permit,
/// are skipped; the rasterizer paints a placeholder for them.
pub async fn load_all(
    sources: Vec<String>,
    timeout: Duration,
    policy: &ImagePolicy,
) -> Result<ImageSet, CaptureError> {
    let mut set = ImageSet::default();

    for src in sources {
        let job_src = src.clone();
        let job_policy = policy.clone();
        let job = tokio::task::spawn_blocking(move || {
            if !job_policy.permits(&job_src) {
                return Err("source is not allowed".to_string());
            }
            load_image(&job_src, timeout)
        });

        match tokio::time::timeout(timeout, job).await {
            Err(_) => {
                return Err(CaptureError::ImageTimeout { timeout_ms: timeout.as_millis() as u64 });
            }
            Ok(Err(join_err)) => {
                tracing::warn!(error = %join_err, "image loader panicked, using placeholder");
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, source = source_kind(&src), "image load failed, using placeholder");
            }
            Ok(Ok(Ok(img))) => {
                tracing::debug!(width = img.width(), height = img.height(), "image loaded");
                set.insert(src, img);
            }
        }
    }

    Ok(set)
}

fn source_kind(src: &str) -> &'static str {
    if src.starts_with("data:") {
        "data-url"
    } else if src.starts_with("http://") || src.starts_with("https://") {
        "remote"
    } else {
        "file"
    }
}

/// Fetch and decode one image source. Remote fetches give up after `timeout`.
pub fn load_image(src: &str, timeout: Duration) -> Result<RgbaImage, String> {
    let bytes = match source_kind(src) {
        "data-url" => load_base64_image(src),
        "remote" => load_remote_image(src, timeout),
        _ => load_local_image(src),
    }?;
    decode_image(&bytes)
}

fn load_base64_image(data_url: &str) -> Result<Vec<u8>, String> {
    // data:image/png;base64,xxxxx
    let (_, payload) = data_url
        .split_once(',')
        .ok_or_else(|| "Invalid data URL format".to_string())?;

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("Base64 decode error: {}", e))
}

fn load_remote_image(url: &str, timeout: Duration) -> Result<Vec<u8>, String> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let response = agent
        .get(url)
        .call()
        .map_err(|e| format!("HTTP request failed: {}", e))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| format!("Failed to read response: {}", e))?;

    Ok(bytes)
}

fn load_local_image(path: &str) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Failed to read file: {}", e))
}

fn decode_image(data: &[u8]) -> Result<RgbaImage, String> {
    if data.is_empty() {
        return Err("Image data is empty".to_string());
    }

    let img = image::ImageReader::new(std::io::Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to guess image format: {}", e))?
        .decode()
        .map_err(|e| format!("Failed to decode image (len={}): {}", data.len(), e))?;

    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(buf))
    }

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_load_data_url() {
        let img = load_image(&png_data_url(3, 2), SECOND).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_load_errors() {
        assert!(load_image("data:image/png;base64", SECOND).is_err());
        assert!(load_image("data:image/png;base64,!!!", SECOND).is_err());
        assert!(load_image("/definitely/not/here.png", SECOND).is_err());
    }

    #[test]
    fn test_stalled_remote_gives_up_after_timeout() {
        // Accepted by the kernel backlog but never answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/logo.png", listener.local_addr().unwrap());

        let started = std::time::Instant::now();
        assert!(load_image(&url, Duration::from_millis(200)).is_err());
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn test_load_all_skips_failures() {
        let good = png_data_url(1, 1);
        let set = load_all(vec![good.clone(), "/missing.png".into()], Duration::from_secs(5), &ImagePolicy::default())
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get(&good).is_some());
        assert!(set.get("/missing.png").is_none());
    }

    #[test]
    fn test_url_host() {
        assert_eq!(url_host("https://cdn.example.com/a.png"), Some("cdn.example.com"));
        assert_eq!(url_host("http://user@cdn.example.com:8080/a.png"), Some("cdn.example.com"));
        assert_eq!(url_host("http://[::1]:3000/a.png"), Some("::1"));
        assert_eq!(url_host("https://cdn.example.com?x=1"), Some("cdn.example.com"));
        assert_eq!(url_host("http:///a.png"), None);
    }

    #[test]
    fn test_restricted_policy() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        std::fs::write(&logo, b"png").unwrap();
        let outside = tempfile::NamedTempFile::new().unwrap();

        let policy = ImagePolicy::Restricted {
            roots: vec![dir.path().to_path_buf()],
            hosts: vec!["cdn.example.com".into()],
        };
        assert!(policy.permits("data:image/png;base64,AAAA"));
        assert!(policy.permits(logo.to_str().unwrap()));
        assert!(policy.permits("https://CDN.example.com/logo.png"));

        let escaped = dir.path().join("..").join(outside.path().file_name().unwrap());
        assert!(!policy.permits(escaped.to_str().unwrap()));
        assert!(!policy.permits("/etc/passwd"));
        assert!(!policy.permits("http://169.254.169.254/latest/meta-data"));
        assert!(!policy.permits("https://cdn.example.com.evil.test/logo.png"));

        let strict = ImagePolicy::data_urls_only();
        assert!(strict.permits("data:image/png;base64,AAAA"));
        assert!(!strict.permits(logo.to_str().unwrap()));
        assert!(ImagePolicy::Unrestricted.permits("/etc/passwd"));
    }

    #[tokio::test]
    async fn test_load_all_skips_disallowed_sources() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255])).save(&logo).unwrap();
        let src = logo.to_str().unwrap().to_string();

        let open = load_all(vec![src.clone()], SECOND, &ImagePolicy::Unrestricted).await.unwrap();
        assert!(open.get(&src).is_some());

        let closed = load_all(vec![src.clone()], SECOND, &ImagePolicy::data_urls_only()).await.unwrap();
        assert!(closed.is_empty());
    }
}
