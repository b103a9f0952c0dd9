use std::path::Path;

use base64::Engine as _;
use chrono::Local;

pub fn detect_mime_type<P: AsRef<Path>>(path: P) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("image/png")
        .to_string()
}

pub fn encode_byte_to_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// `data:<mime>;base64,<payload>`, the form the API accepts in place of an image URL.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", encode_byte_to_base64(bytes))
}

pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Extension for a downloaded video, taken from the asset URL when it names a video type.
pub fn video_extension_for_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let is_video = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::VIDEO)
        .unwrap_or(false);

    if is_video {
        if let Some(ext) = Path::new(path).extension().and_then(|ext| ext.to_str()) {
            return ext.to_lowercase();
        }
    }

    "mp4".to_string()
}

/// `<prefix>_<YYYYmmdd_HHMMSS>_<8 hex chars>.<ext>`.
///
/// The random part keeps two jobs finishing within the same second from sharing a file.
pub fn unique_output_file_name(prefix: &str, extension: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{timestamp}_{}.{extension}", &suffix[..8])
}
