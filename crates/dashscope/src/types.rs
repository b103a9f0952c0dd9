use std::fmt;
use std::str::FromStr;

use crate::error::{JobError, Result};

pub const INTERNATIONAL_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/api/v1";
pub const MAINLAND_CHINA_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";

/// A DashScope API key. The `Debug` output only ever shows a masked form.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trims whitespace and surrounding quotes, as keys pasted into `.env` files often carry them.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let cleaned = raw
            .as_ref()
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();

        if cleaned.is_empty() {
            return Err(JobError::Configuration(
                "DashScope API key is empty. Set DASHSCOPE_API_KEY before using this node.".into(),
            ));
        }

        Ok(Self(cleaned.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 8 and last 4 characters, enough to tell keys apart in logs.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 12 {
            return "****".to_string();
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Region {
    #[default]
    International,
    MainlandChina,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::International => "international",
            Region::MainlandChina => "mainland_china",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Region::International => INTERNATIONAL_BASE_URL,
            Region::MainlandChina => MAINLAND_CHINA_BASE_URL,
        }
    }

    pub fn all() -> [Region; 2] {
        [Region::International, Region::MainlandChina]
    }
}

impl FromStr for Region {
    type Err = JobError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "international" | "intl" => Ok(Region::International),
            "mainland_china" | "china" | "cn" => Ok(Region::MainlandChina),
            other => Err(JobError::Validation(format!("Unknown region '{other}'"))),
        }
    }
}

/// Submission services; each mode posts to exactly one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    TextToImage,
    ImageToImage,
    VideoSynthesis,
    KeyframeToVideo,
}

impl Service {
    pub fn path(&self) -> &'static str {
        match self {
            Service::TextToImage => "/services/aigc/text2image/image-synthesis",
            Service::ImageToImage => "/services/aigc/image2image/image-synthesis",
            Service::VideoSynthesis => "/services/aigc/video-generation/video-synthesis",
            Service::KeyframeToVideo => "/services/aigc/image2video/video-synthesis",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn for_region(region: Region) -> Self {
        Self::custom(region.base_url())
    }

    /// Points every service at another host, e.g. a proxy or a local stub.
    pub fn custom(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn submit_url(&self, service: Service) -> String {
        format!("{}{}", self.base_url, service.path())
    }

    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}/tasks/{}", self.base_url, task_id)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_region(Region::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_strips_quotes_and_whitespace() {
        let key = ApiKey::new("  \"sk-0123456789abcdef\" \n").unwrap();
        assert_eq!(key.expose(), "sk-0123456789abcdef");
        assert_eq!(key.masked(), "sk-01234...cdef");
        assert!(!format!("{key:?}").contains("56789ab"));
    }

    #[test]
    fn test_empty_api_key_is_configuration_error() {
        assert!(matches!(ApiKey::new(" '' "), Err(JobError::Configuration(_))));
    }

    #[test]
    fn test_region_urls() {
        let intl = Endpoints::for_region(Region::International);
        assert_eq!(
            intl.submit_url(Service::TextToImage),
            "https://dashscope-intl.aliyuncs.com/api/v1/services/aigc/text2image/image-synthesis"
        );
        let cn = Endpoints::for_region("mainland_china".parse().unwrap());
        assert_eq!(cn.task_url("abc"), "https://dashscope.aliyuncs.com/api/v1/tasks/abc");
    }

    #[test]
    fn test_custom_base_url_trims_slash() {
        let endpoints = Endpoints::custom("http://127.0.0.1:8080/api/v1/");
        assert_eq!(endpoints.task_url("t-1"), "http://127.0.0.1:8080/api/v1/tasks/t-1");
    }
}
