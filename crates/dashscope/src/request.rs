use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value, json};

use crate::error::{JobError, Result};
use crate::presets::{MAX_SEED, Mode, ModePreset};
use crate::tensor::{ImageTensor, encode_png};
use crate::utils::{detect_mime_type, is_http_url, to_data_url};

/// Where a reference image or video comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaSource {
    Url(String),
    /// Encoded bytes sent inline as a base64 data URL.
    Inline { mime_type: String, bytes: Vec<u8> },
}

impl MediaSource {
    pub fn url(url: impl Into<String>) -> Self {
        MediaSource::Url(url.into())
    }

    /// Encodes the first image of a host tensor as PNG.
    pub fn from_tensor(tensor: &ImageTensor) -> Result<Self> {
        Ok(MediaSource::Inline {
            mime_type: "image/png".into(),
            bytes: encode_png(tensor, 0)?,
        })
    }

    /// Reads a local file to send inline, typed by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(MediaSource::Inline {
            mime_type: detect_mime_type(path),
            bytes: fs::read(path)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MediaSource::Url(url) => url.trim().is_empty(),
            MediaSource::Inline { bytes, .. } => bytes.is_empty(),
        }
    }

    fn render(&self) -> String {
        match self {
            MediaSource::Url(url) => url.trim().to_string(),
            MediaSource::Inline { mime_type, bytes } => to_data_url(mime_type, bytes),
        }
    }
}

/// Everything needed for one generation job. Defaults (`0`, `""`, empty collections)
/// mean "not set" and are left out of the payload so the service applies its own defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub mode: Mode,
    pub model: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub media: BTreeMap<String, MediaSource>,
    pub media_list: Vec<MediaSource>,
    pub seed: u32,
    pub size: String,
    pub watermark: bool,
    pub prompt_extend: bool,
    pub control_condition: String,
    pub template: String,
    pub num_images: u32,
    pub extra_input: Map<String, Value>,
    pub extra_parameters: Map<String, Value>,
}

impl GenerationRequest {
    /// A request using the mode's default model and size.
    pub fn new(mode: Mode, prompt: impl Into<String>) -> Self {
        let preset = mode.preset();
        Self {
            mode,
            model: preset.default_model.to_string(),
            prompt: prompt.into(),
            negative_prompt: String::new(),
            media: BTreeMap::new(),
            media_list: Vec::new(),
            seed: 0,
            size: preset
                .size
                .as_ref()
                .map(|size| size.default.to_string())
                .unwrap_or_default(),
            watermark: false,
            prompt_extend: true,
            control_condition: String::new(),
            template: String::new(),
            num_images: 1,
            extra_input: Map::new(),
            extra_parameters: Map::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_media(mut self, field: impl Into<String>, source: MediaSource) -> Self {
        self.media.insert(field.into(), source);
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = negative_prompt.into();
        self
    }

    pub fn preset(&self) -> &'static ModePreset {
        self.mode.preset()
    }

    /// Checks the request against its mode's allow-lists and invariants.
    pub fn validate(&self) -> Result<()> {
        let preset = self.preset();

        if !preset.allows_model(&self.model) {
            return Err(invalid(format!(
                "Model '{}' is not available for {}. Expected one of: {}",
                self.model,
                preset.label,
                preset.models.join(", ")
            )));
        }

        if self.seed > MAX_SEED {
            return Err(invalid(format!(
                "Seed {} exceeds the maximum of {MAX_SEED}",
                self.seed
            )));
        }

        match &preset.size {
            Some(size) if !self.size.is_empty() && !size.options.contains(&self.size.as_str()) => {
                return Err(invalid(format!(
                    "Unsupported {} '{}' for {}. Expected one of: {}",
                    size.key,
                    self.size,
                    preset.label,
                    size.options.join(", ")
                )));
            }
            None if !self.size.is_empty() => {
                return Err(invalid(format!("{} does not take a size", preset.label)));
            }
            _ => {}
        }

        if !self.negative_prompt.is_empty() && !preset.supports_negative_prompt {
            return Err(invalid(format!(
                "{} does not take a negative prompt",
                preset.label
            )));
        }

        if self.control_condition.is_empty() {
            if preset.control_required {
                return Err(invalid(format!(
                    "{} requires a control condition: {}",
                    preset.label,
                    preset.control_conditions.join(", ")
                )));
            }
        } else if !preset
            .control_conditions
            .contains(&self.control_condition.as_str())
        {
            return Err(invalid(format!(
                "Unsupported control condition '{}' for {}",
                self.control_condition, preset.label
            )));
        }

        if self.template.is_empty() {
            if !preset.templates.is_empty() {
                return Err(invalid(format!("{} requires an effect template", preset.label)));
            }
        } else if !preset.templates.contains(&self.template.as_str()) {
            return Err(invalid(format!(
                "Unsupported effect template '{}'",
                self.template
            )));
        }

        if let Some((min, max)) = preset.batch {
            if self.num_images < min || self.num_images > max {
                return Err(invalid(format!(
                    "Number of images must be between {min} and {max}, got {}",
                    self.num_images
                )));
            }
        }

        for (field, source) in &self.media {
            if !preset.url_fields.contains(&field.as_str()) {
                return Err(invalid(format!(
                    "{} does not accept '{field}'",
                    preset.label
                )));
            }
            if let MediaSource::Url(url) = source {
                let url = url.trim();
                if !url.is_empty() && !is_http_url(url) && !url.starts_with("data:") {
                    return Err(invalid(format!("'{field}' must be an http(s) URL, got '{url}'")));
                }
            }
        }

        for field in preset.required_url_fields {
            let present = self
                .media
                .get(*field)
                .map(|source| !source.is_empty())
                .unwrap_or(false);
            if !present {
                return Err(invalid(format!("{} requires '{field}'", preset.label)));
            }
        }

        let list_len = self.media_list.iter().filter(|s| !s.is_empty()).count();
        match preset.url_list {
            Some((name, min, max)) if list_len < min || list_len > max => {
                return Err(invalid(format!(
                    "'{name}' takes between {min} and {max} entries, got {list_len}"
                )));
            }
            None if list_len > 0 => {
                return Err(invalid(format!(
                    "{} does not take a list of reference images",
                    preset.label
                )));
            }
            _ => {}
        }

        for key in self.extra_input.keys() {
            if !preset.extra_inputs.contains(&key.as_str()) {
                return Err(invalid(format!("{} does not accept input '{key}'", preset.label)));
            }
        }
        for key in self.extra_parameters.keys() {
            if !preset.extra_parameters.contains(&key.as_str()) {
                return Err(invalid(format!(
                    "{} does not accept parameter '{key}'",
                    preset.label
                )));
            }
        }

        let has_prompt = !self.prompt.trim().is_empty();
        if preset.prompt_required && !has_prompt {
            return Err(invalid(format!("{} requires a prompt", preset.label)));
        }
        let has_media = self.media.values().any(|s| !s.is_empty()) || list_len > 0;
        if !has_prompt && !has_media {
            return Err(invalid("A prompt or a reference image/video is required"));
        }

        Ok(())
    }

    /// The JSON body posted to the submission endpoint.
    pub fn to_payload(&self) -> Value {
        let preset = self.preset();

        let mut input = Map::new();
        if let Some(function) = preset.function {
            input.insert("function".into(), json!(function));
        }
        if !self.prompt.is_empty() {
            input.insert("prompt".into(), json!(self.prompt));
        }
        if !self.negative_prompt.is_empty() {
            input.insert("negative_prompt".into(), json!(self.negative_prompt));
        }
        for (field, source) in &self.media {
            if !source.is_empty() {
                input.insert(field.clone(), json!(source.render()));
            }
        }
        if let Some((name, _, _)) = preset.url_list {
            let urls: Vec<String> = self
                .media_list
                .iter()
                .filter(|source| !source.is_empty())
                .map(MediaSource::render)
                .collect();
            input.insert(name.into(), json!(urls));
        }
        if !self.template.is_empty() {
            input.insert("template".into(), json!(self.template));
        }
        for (key, value) in &self.extra_input {
            if !value.is_null() {
                input.insert(key.clone(), value.clone());
            }
        }

        let mut parameters = Map::new();
        if let Some(size) = &preset.size {
            if !self.size.is_empty() {
                parameters.insert(size.key.into(), json!(self.size));
            }
        }
        if preset.supports_prompt_extend {
            parameters.insert("prompt_extend".into(), json!(self.prompt_extend));
        }
        parameters.insert("watermark".into(), json!(self.watermark));
        if preset.batch.is_some() {
            parameters.insert("n".into(), json!(self.num_images));
        }
        if self.seed > 0 {
            parameters.insert("seed".into(), json!(self.seed));
        }
        if !self.control_condition.is_empty() {
            parameters.insert("control_condition".into(), json!(self.control_condition));
        }
        for (key, value) in &self.extra_parameters {
            if !value.is_null() {
                parameters.insert(key.clone(), value.clone());
            }
        }

        json!({
            "model": self.model,
            "input": input,
            "parameters": parameters
        })
    }
}

fn invalid(message: impl Into<String>) -> JobError {
    JobError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_is_omitted() {
        let payload = GenerationRequest::new(Mode::TextToImage, "a cat").to_payload();
        assert!(payload["parameters"].get("seed").is_none());

        let payload = GenerationRequest::new(Mode::TextToImage, "a cat")
            .with_seed(42)
            .to_payload();
        assert_eq!(payload["parameters"]["seed"], json!(42));
    }

    #[test]
    fn test_empty_negative_prompt_is_omitted() {
        let payload = GenerationRequest::new(Mode::TextToImage, "a cat").to_payload();
        assert!(payload["input"].get("negative_prompt").is_none());

        let payload = GenerationRequest::new(Mode::TextToImage, "a cat")
            .with_negative_prompt("  blurry, low quality ")
            .to_payload();
        assert_eq!(payload["input"]["negative_prompt"], json!("  blurry, low quality "));
    }

    #[test]
    fn test_text_to_image_payload_shape() {
        let payload = GenerationRequest::new(Mode::TextToImage, "Generate an image of a cat")
            .with_model("wan2.2-t2i-plus")
            .to_payload();
        assert_eq!(
            payload,
            json!({
                "model": "wan2.2-t2i-plus",
                "input": { "prompt": "Generate an image of a cat" },
                "parameters": {
                    "size": "1024*1024",
                    "prompt_extend": true,
                    "watermark": false,
                    "n": 1
                }
            })
        );
    }

    #[test]
    fn test_video_extension_payload_skips_empty_urls() {
        let mut request = GenerationRequest::new(Mode::VaceVideoExtension, "extend it")
            .with_media("first_clip_url", MediaSource::url("https://example.com/a.mp4"))
            .with_media("last_frame_url", MediaSource::url(""));
        request.prompt_extend = false;
        request.control_condition = "depth".into();
        request.validate().unwrap();

        let payload = request.to_payload();
        assert_eq!(payload["input"]["function"], json!("video_extension"));
        assert_eq!(payload["input"]["first_clip_url"], json!("https://example.com/a.mp4"));
        assert!(payload["input"].get("last_frame_url").is_none());
        assert_eq!(payload["parameters"]["control_condition"], json!("depth"));
        assert_eq!(payload["parameters"]["prompt_extend"], json!(false));
        assert!(payload["parameters"].get("size").is_none());
        assert!(payload["parameters"].get("n").is_none());
    }

    #[test]
    fn test_image_to_image_lists_images() {
        let mut request = GenerationRequest::new(Mode::ImageToImage, "make it snowy");
        request.media_list = vec![
            MediaSource::url("https://example.com/1.png"),
            MediaSource::url(" "),
            MediaSource::url("https://example.com/2.png"),
        ];
        request.num_images = 3;
        request.validate().unwrap();

        let payload = request.to_payload();
        assert_eq!(
            payload["input"]["images"],
            json!(["https://example.com/1.png", "https://example.com/2.png"])
        );
        assert_eq!(payload["parameters"]["n"], json!(3));
        assert!(payload["parameters"].get("prompt_extend").is_none());
    }

    #[test]
    fn test_inline_image_becomes_data_url() {
        let request = GenerationRequest::new(Mode::ImageToVideo, "").with_media(
            "img_url",
            MediaSource::Inline {
                mime_type: "image/png".into(),
                bytes: b"abc".to_vec(),
            },
        );
        request.validate().unwrap();
        assert_eq!(
            request.to_payload()["input"]["img_url"],
            json!("data:image/png;base64,YWJj")
        );
    }

    #[test]
    fn test_local_file_is_sent_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.jpg");
        fs::write(&path, b"jpeg").unwrap();

        let source = MediaSource::from_path(&path).unwrap();
        assert_eq!(
            source,
            MediaSource::Inline {
                mime_type: "image/jpeg".into(),
                bytes: b"jpeg".to_vec(),
            }
        );
        assert!(MediaSource::from_path(dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_values() {
        let request = GenerationRequest::new(Mode::TextToImage, "cat").with_model("wan9");
        assert!(matches!(request.validate(), Err(JobError::Validation(_))));

        let mut request = GenerationRequest::new(Mode::TextToImage, "cat");
        request.size = "333*333".into();
        assert!(request.validate().is_err());

        let request = GenerationRequest::new(Mode::TextToImage, "cat").with_seed(MAX_SEED + 1);
        assert!(request.validate().is_err());

        let request = GenerationRequest::new(Mode::TextToImage, "cat").with_seed(MAX_SEED);
        assert!(request.validate().is_ok());

        let mut request = GenerationRequest::new(Mode::TextToImage, "cat");
        request.num_images = 2;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validation_requires_primary_input() {
        let request = GenerationRequest::new(Mode::TextToImage, "   ");
        assert!(request.validate().is_err());

        let request = GenerationRequest::new(Mode::ImageToVideo, "");
        assert!(request.validate().is_err());

        let request = GenerationRequest::new(Mode::ImageToVideo, "")
            .with_media("img_url", MediaSource::url("https://example.com/cat.png"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_repainting_requires_control_condition() {
        let request = GenerationRequest::new(Mode::VaceVideoRepainting, "repaint")
            .with_media("video_url", MediaSource::url("https://example.com/v.mp4"));
        assert!(request.validate().is_err());

        let mut request = request;
        request.control_condition = "posebody".into();
        request.extra_parameters.insert("strength".into(), json!(0.5));
        assert!(request.validate().is_ok());
        assert_eq!(request.to_payload()["parameters"]["strength"], json!(0.5));
    }

    #[test]
    fn test_effect_requires_known_template() {
        let mut request = GenerationRequest::new(Mode::ImageToVideoEffect, "")
            .with_media("img_url", MediaSource::url("https://example.com/cat.png"));
        assert!(request.validate().is_err());
        request.template = "flying".into();
        assert!(request.validate().is_ok());
        assert_eq!(request.to_payload()["input"]["template"], json!("flying"));
        request.template = "teleport".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_unknown_media_field_rejected() {
        let request = GenerationRequest::new(Mode::TextToVideo, "waves")
            .with_media("img_url", MediaSource::url("https://example.com/cat.png"));
        assert!(request.validate().is_err());

        let request = GenerationRequest::new(Mode::VaceVideoOutpainting, "wider")
            .with_media("video_url", MediaSource::url("ftp://example.com/v.mp4"));
        assert!(request.validate().is_err());
    }
}
