// Result renderer: turns a finished generation into something to show.
// Fetch and decode failures are display errors, distinct from both a failed
// generation and an empty result.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use reqwest::Url;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{GenerationResult, ImageFetcher};
use crate::error::FetchError;
use crate::params::GenerationRequest;

pub const NO_IMAGE_MESSAGE: &str = "No image was generated. Please try again.";
const FALLBACK_FILE_NAME: &str = "generated.jpeg";

/// A fetched and decoded image together with the parameters behind it.
#[derive(Debug, Clone)]
pub struct RenderedOutput {
    pub url: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
    pub parameters: Value,
}

impl RenderedOutput {
    /// Image source; also the download link target.
    pub fn download_url(&self) -> &str {
        &self.url
    }

    /// Last path segment of the URL, or a generic name.
    pub fn suggested_file_name(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.path_segments()?.last().map(str::to_string))
            .filter(|name| name.contains('.') && !name.contains(['/', '\\']))
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
    }

    /// Pretty JSON dump of the generation parameters.
    pub fn parameters_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.parameters).unwrap_or_else(|_| self.parameters.to_string())
    }

    /// Write the original bytes to `path`. If `path` is a directory the
    /// suggested file name is appended.
    pub fn save_to(&self, path: &Path) -> Result<PathBuf, FetchError> {
        let target = if path.is_dir() {
            path.join(self.suggested_file_name())
        } else {
            path.to_path_buf()
        };
        fs::write(&target, &self.bytes)?;
        info!(path = %target.display(), "saved image");
        Ok(target)
    }
}

#[derive(Debug)]
pub enum RenderOutcome {
    Rendered(RenderedOutput),
    /// The call succeeded but produced no image.
    NoImage,
    /// An image URL came back but could not be shown.
    DisplayFailed(FetchError),
}

/// Fetch and decode the first image of `result`. No fetch is attempted when
/// the result has no images.
pub fn render<F: ImageFetcher + ?Sized>(
    result: &GenerationResult,
    request: &GenerationRequest,
    fetcher: &F,
) -> RenderOutcome {
    let Some(first) = result.first_image() else {
        warn!("generation returned no images");
        return RenderOutcome::NoImage;
    };

    match fetch_and_decode(&first.url, fetcher) {
        Ok((bytes, width, height, format)) => RenderOutcome::Rendered(RenderedOutput {
            url: first.url.clone(),
            bytes,
            width,
            height,
            format,
            parameters: request.summary(),
        }),
        Err(e) => {
            warn!(url = %first.url, error = %e, "could not display image");
            RenderOutcome::DisplayFailed(e)
        }
    }
}

fn fetch_and_decode<F: ImageFetcher + ?Sized>(
    url: &str,
    fetcher: &F,
) -> Result<(Vec<u8>, u32, u32, Option<ImageFormat>), FetchError> {
    let bytes = fetcher.fetch(url)?;
    let format = image::guess_format(&bytes).ok();
    let img = image::load_from_memory(&bytes)?;
    Ok((bytes, img.width(), img.height(), format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ImageRef;
    use crate::params::ParameterCollector;
    use reqwest::StatusCode;
    use std::cell::RefCell;
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbImage::new(w, h);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    struct Fetcher {
        reply: Result<Vec<u8>, StatusCode>,
        calls: RefCell<Vec<String>>,
    }

    impl ImageFetcher for Fetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            match &self.reply {
                Ok(b) => Ok(b.clone()),
                Err(status) => Err(FetchError::Http {
                    url: url.to_string(),
                    status: *status,
                }),
            }
        }
    }

    fn fetcher(reply: Result<Vec<u8>, StatusCode>) -> Fetcher {
        Fetcher {
            reply,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn result_with(urls: &[&str]) -> GenerationResult {
        GenerationResult {
            images: urls
                .iter()
                .map(|u| ImageRef { url: u.to_string() })
                .collect(),
        }
    }

    fn request() -> GenerationRequest {
        let mut p = ParameterCollector::new();
        p.set_prompt("misty forest");
        p.to_request()
    }

    #[test]
    fn first_url_is_source_and_download_link() {
        let f = fetcher(Ok(png_bytes(4, 3)));
        let outcome = render(&result_with(&["http://x/img.jpg", "http://x/other.jpg"]), &request(), &f);
        let RenderOutcome::Rendered(out) = outcome else {
            panic!("expected rendered output");
        };
        assert_eq!(*f.calls.borrow(), vec!["http://x/img.jpg".to_string()]);
        assert_eq!(out.url, "http://x/img.jpg");
        assert_eq!(out.download_url(), "http://x/img.jpg");
        assert_eq!((out.width, out.height), (4, 3));
        assert_eq!(out.format, Some(ImageFormat::Png));
        assert_eq!(out.parameters["steps"], 28);
        assert_eq!(out.parameters["prompt"], "misty forest");
        assert_eq!(out.parameters["image_size"], "landscape_4_3");
    }

    #[test]
    fn empty_result_never_fetches() {
        let f = fetcher(Ok(png_bytes(1, 1)));
        let outcome = render(&GenerationResult::default(), &request(), &f);
        assert!(matches!(outcome, RenderOutcome::NoImage));
        assert!(f.calls.borrow().is_empty());
    }

    #[test]
    fn fetch_failure_is_display_error() {
        let f = fetcher(Err(StatusCode::NOT_FOUND));
        let outcome = render(&result_with(&["http://x/gone.jpg"]), &request(), &f);
        assert!(matches!(
            outcome,
            RenderOutcome::DisplayFailed(FetchError::Http { status, .. }) if status == StatusCode::NOT_FOUND
        ));
    }

    #[test]
    fn undecodable_bytes_are_display_error() {
        let f = fetcher(Ok(b"<html>not an image</html>".to_vec()));
        let outcome = render(&result_with(&["http://x/img.jpg"]), &request(), &f);
        assert!(matches!(outcome, RenderOutcome::DisplayFailed(FetchError::Decode(_))));
    }

    #[test]
    fn file_name_comes_from_url() {
        let f = fetcher(Ok(png_bytes(1, 1)));
        let RenderOutcome::Rendered(mut out) =
            render(&result_with(&["https://cdn.example/files/abc123.jpeg?sig=1"]), &request(), &f)
        else {
            panic!("expected rendered output");
        };
        assert_eq!(out.suggested_file_name(), "abc123.jpeg");
        out.url = "https://cdn.example/files/".into();
        assert_eq!(out.suggested_file_name(), "generated.jpeg");
        out.url = "https://cdn.example/a/b/pic.jpg#frag?x=/y.png".into();
        assert_eq!(out.suggested_file_name(), "pic.jpg");
        out.url = "https://cdn.example/a/shot.png?name=other/evil.jpg".into();
        assert_eq!(out.suggested_file_name(), "shot.png");
        out.url = "not a url".into();
        assert_eq!(out.suggested_file_name(), "generated.jpeg");
    }

    #[test]
    fn save_into_directory_uses_suggested_name() {
        let bytes = png_bytes(2, 2);
        let f = fetcher(Ok(bytes.clone()));
        let RenderOutcome::Rendered(out) = render(&result_with(&["http://x/pic.png"]), &request(), &f) else {
            panic!("expected rendered output");
        };
        let dir = tempfile::tempdir().unwrap();
        let saved = out.save_to(dir.path()).unwrap();
        assert_eq!(saved, dir.path().join("pic.png"));
        assert_eq!(fs::read(&saved).unwrap(), bytes);

        let explicit = dir.path().join("mine.png");
        assert_eq!(out.save_to(&explicit).unwrap(), explicit);
    }
}
