//! Static description of every generation mode the Wan models expose.
//!
//! All modes share one submit/poll/download protocol. What differs is the endpoint,
//! the allowed values and which payload fields exist, and all of that lives here.

use std::fmt;
use std::time::Duration;

use crate::types::Service;

pub const MAX_SEED: u32 = 2_147_483_647;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    TextToImage,
    ImageToImage,
    TextToVideo,
    ImageToVideo,
    ImageToVideoEffect,
    KeyframeToVideo,
    VaceImageReference,
    VaceVideoRepainting,
    VaceVideoEdit,
    VaceVideoExtension,
    VaceVideoOutpainting,
}

impl Mode {
    pub fn all() -> [Mode; 11] {
        [
            Mode::TextToImage,
            Mode::ImageToImage,
            Mode::TextToVideo,
            Mode::ImageToVideo,
            Mode::ImageToVideoEffect,
            Mode::KeyframeToVideo,
            Mode::VaceImageReference,
            Mode::VaceVideoRepainting,
            Mode::VaceVideoEdit,
            Mode::VaceVideoExtension,
            Mode::VaceVideoOutpainting,
        ]
    }

    pub fn preset(&self) -> &'static ModePreset {
        match self {
            Mode::TextToImage => &TEXT_TO_IMAGE,
            Mode::ImageToImage => &IMAGE_TO_IMAGE,
            Mode::TextToVideo => &TEXT_TO_VIDEO,
            Mode::ImageToVideo => &IMAGE_TO_VIDEO,
            Mode::ImageToVideoEffect => &IMAGE_TO_VIDEO_EFFECT,
            Mode::KeyframeToVideo => &KEYFRAME_TO_VIDEO,
            Mode::VaceImageReference => &VACE_IMAGE_REFERENCE,
            Mode::VaceVideoRepainting => &VACE_VIDEO_REPAINTING,
            Mode::VaceVideoEdit => &VACE_VIDEO_EDIT,
            Mode::VaceVideoExtension => &VACE_VIDEO_EXTENSION,
            Mode::VaceVideoOutpainting => &VACE_VIDEO_OUTPAINTING,
        }
    }

    pub fn media(&self) -> MediaKind {
        self.preset().media
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preset().label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn poll_policy(&self) -> PollPolicy {
        match self {
            MediaKind::Image => PollPolicy {
                interval: Duration::from_secs(5),
                max_attempts: 30,
            },
            MediaKind::Video => PollPolicy {
                interval: Duration::from_secs(10),
                max_attempts: 60,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// The size-like parameter of a mode. Image and text-to-video modes call it `size`
/// (`"1024*1024"`), image-to-video modes call it `resolution` (`"720P"`).
#[derive(Debug)]
pub struct SizeField {
    pub key: &'static str,
    pub options: &'static [&'static str],
    pub default: &'static str,
}

#[derive(Debug)]
pub struct ModePreset {
    pub mode: Mode,
    pub label: &'static str,
    pub service: Service,
    pub media: MediaKind,
    pub models: &'static [&'static str],
    pub default_model: &'static str,
    pub size: Option<SizeField>,
    /// `input.function` for the VACE family.
    pub function: Option<&'static str>,
    pub prompt_required: bool,
    pub supports_negative_prompt: bool,
    pub supports_prompt_extend: bool,
    /// Named single-URL fields accepted under `input`.
    pub url_fields: &'static [&'static str],
    pub required_url_fields: &'static [&'static str],
    /// Array-of-URLs field under `input`, with (min, max) length.
    pub url_list: Option<(&'static str, usize, usize)>,
    pub control_conditions: &'static [&'static str],
    pub control_required: bool,
    pub templates: &'static [&'static str],
    /// Bounds for `parameters.n`; only image modes emit it.
    pub batch: Option<(u32, u32)>,
    pub extra_inputs: &'static [&'static str],
    pub extra_parameters: &'static [&'static str],
    pub file_prefix: &'static str,
}

impl ModePreset {
    pub fn poll_policy(&self) -> PollPolicy {
        self.media.poll_policy()
    }

    pub fn allows_model(&self, model: &str) -> bool {
        self.models.contains(&model)
    }
}

const T2I_SIZES: &[&str] = &[
    "1024*1024", "1152*896", "896*1152", "1280*720", "720*1280", "1440*512", "512*1440",
];

const I2I_SIZES: &[&str] = &[
    "1024*1024", "1152*896", "896*1152", "1280*720", "720*1280", "1440*512", "512*1440",
    "768*768", "1440*1440",
];

const T2V_SIZES: &[&str] = &[
    "1920*1080", "1080*1920", "1440*1440", "1632*1248", "1248*1632", "1280*720", "720*1280",
    "960*960", "1088*832", "832*1088", "832*480", "480*832", "624*624",
];

const VACE_SIZES: &[&str] = &["1280*720", "720*1280", "960*960", "832*1088", "1088*832"];

const VIDEO_RESOLUTIONS: &[&str] = &["480P", "720P", "1080P"];

const POSE_CONTROLS: &[&str] = &["posebodyface", "posebody", "depth", "scribble"];

const EFFECT_TEMPLATES: &[&str] = &[
    "squish", "flying", "rotation", "poke", "inflate", "dissolve", "carousel", "singleheart",
    "dance1", "dance2", "dance3", "mermaid", "graduation", "dragon", "money",
];

const VACE_MODELS: &[&str] = &["wan2.1-vace-plus"];

pub static TEXT_TO_IMAGE: ModePreset = ModePreset {
    mode: Mode::TextToImage,
    label: "text-to-image",
    service: Service::TextToImage,
    media: MediaKind::Image,
    models: &["wan2.2-t2i-flash", "wan2.2-t2i-plus"],
    default_model: "wan2.2-t2i-flash",
    size: Some(SizeField {
        key: "size",
        options: T2I_SIZES,
        default: "1024*1024",
    }),
    function: None,
    prompt_required: true,
    supports_negative_prompt: true,
    supports_prompt_extend: true,
    url_fields: &[],
    required_url_fields: &[],
    url_list: None,
    control_conditions: &[],
    control_required: false,
    templates: &[],
    batch: Some((1, 1)),
    extra_inputs: &[],
    extra_parameters: &[],
    file_prefix: "wan_t2i",
};

pub static IMAGE_TO_IMAGE: ModePreset = ModePreset {
    mode: Mode::ImageToImage,
    label: "image-to-image",
    service: Service::ImageToImage,
    media: MediaKind::Image,
    models: &["wan2.5-i2i-preview"],
    default_model: "wan2.5-i2i-preview",
    size: Some(SizeField {
        key: "size",
        options: I2I_SIZES,
        default: "1024*1024",
    }),
    function: None,
    prompt_required: true,
    supports_negative_prompt: true,
    supports_prompt_extend: false,
    url_fields: &[],
    required_url_fields: &[],
    url_list: Some(("images", 1, 2)),
    control_conditions: &[],
    control_required: false,
    templates: &[],
    batch: Some((1, 4)),
    extra_inputs: &[],
    extra_parameters: &[],
    file_prefix: "wan_i2i",
};

pub static TEXT_TO_VIDEO: ModePreset = ModePreset {
    mode: Mode::TextToVideo,
    label: "text-to-video",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: &["wan2.2-t2v-plus", "wan2.1-t2v-turbo", "wan2.1-t2v-plus"],
    default_model: "wan2.2-t2v-plus",
    size: Some(SizeField {
        key: "size",
        options: T2V_SIZES,
        default: "1920*1080",
    }),
    function: None,
    prompt_required: true,
    supports_negative_prompt: true,
    supports_prompt_extend: true,
    url_fields: &[],
    required_url_fields: &[],
    url_list: None,
    control_conditions: &[],
    control_required: false,
    templates: &[],
    batch: None,
    extra_inputs: &[],
    extra_parameters: &[],
    file_prefix: "wan_t2v",
};

pub static IMAGE_TO_VIDEO: ModePreset = ModePreset {
    mode: Mode::ImageToVideo,
    label: "image-to-video",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: &[
        "wan2.2-i2v-flash",
        "wan2.2-i2v-plus",
        "wan2.1-i2v-turbo",
        "wan2.1-i2v-plus",
    ],
    default_model: "wan2.2-i2v-flash",
    size: Some(SizeField {
        key: "resolution",
        options: VIDEO_RESOLUTIONS,
        default: "720P",
    }),
    function: None,
    prompt_required: false,
    supports_negative_prompt: true,
    supports_prompt_extend: true,
    url_fields: &["img_url"],
    required_url_fields: &["img_url"],
    url_list: None,
    control_conditions: &[],
    control_required: false,
    templates: &[],
    batch: None,
    extra_inputs: &[],
    extra_parameters: &[],
    file_prefix: "wan_i2v",
};

pub static IMAGE_TO_VIDEO_EFFECT: ModePreset = ModePreset {
    mode: Mode::ImageToVideoEffect,
    label: "image-to-video effect",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: &["wan2.1-i2v-turbo", "wan2.1-i2v-plus"],
    default_model: "wan2.1-i2v-turbo",
    size: Some(SizeField {
        key: "resolution",
        options: &["480P", "720P"],
        default: "720P",
    }),
    function: None,
    prompt_required: false,
    supports_negative_prompt: false,
    supports_prompt_extend: false,
    url_fields: &["img_url"],
    required_url_fields: &["img_url"],
    url_list: None,
    control_conditions: &[],
    control_required: false,
    templates: EFFECT_TEMPLATES,
    batch: None,
    extra_inputs: &[],
    extra_parameters: &[],
    file_prefix: "wan_i2v_effect",
};

pub static KEYFRAME_TO_VIDEO: ModePreset = ModePreset {
    mode: Mode::KeyframeToVideo,
    label: "first/last frame to video",
    service: Service::KeyframeToVideo,
    media: MediaKind::Video,
    models: &["wan2.1-kf2v-plus"],
    default_model: "wan2.1-kf2v-plus",
    size: Some(SizeField {
        key: "resolution",
        options: &["720P"],
        default: "720P",
    }),
    function: None,
    prompt_required: false,
    supports_negative_prompt: true,
    supports_prompt_extend: true,
    url_fields: &["first_frame_url", "last_frame_url"],
    required_url_fields: &["first_frame_url", "last_frame_url"],
    url_list: None,
    control_conditions: &[],
    control_required: false,
    templates: &[],
    batch: None,
    extra_inputs: &[],
    extra_parameters: &[],
    file_prefix: "wan_ii2v",
};

pub static VACE_IMAGE_REFERENCE: ModePreset = ModePreset {
    mode: Mode::VaceImageReference,
    label: "VACE image reference",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: VACE_MODELS,
    default_model: "wan2.1-vace-plus",
    size: Some(SizeField {
        key: "size",
        options: VACE_SIZES,
        default: "1280*720",
    }),
    function: Some("image_reference"),
    prompt_required: true,
    supports_negative_prompt: false,
    supports_prompt_extend: true,
    url_fields: &[],
    required_url_fields: &[],
    url_list: Some(("ref_images_url", 1, 3)),
    control_conditions: &[],
    control_required: false,
    templates: &[],
    batch: None,
    extra_inputs: &["obj_or_bg"],
    extra_parameters: &[],
    file_prefix: "wan_vace_image_reference",
};

pub static VACE_VIDEO_REPAINTING: ModePreset = ModePreset {
    mode: Mode::VaceVideoRepainting,
    label: "VACE video repainting",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: VACE_MODELS,
    default_model: "wan2.1-vace-plus",
    size: None,
    function: Some("video_repainting"),
    prompt_required: true,
    supports_negative_prompt: false,
    supports_prompt_extend: true,
    url_fields: &["video_url"],
    required_url_fields: &["video_url"],
    url_list: None,
    control_conditions: POSE_CONTROLS,
    control_required: true,
    templates: &[],
    batch: None,
    extra_inputs: &[],
    extra_parameters: &["strength"],
    file_prefix: "wan_vace_video_repainting",
};

pub static VACE_VIDEO_EDIT: ModePreset = ModePreset {
    mode: Mode::VaceVideoEdit,
    label: "VACE video edit",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: VACE_MODELS,
    default_model: "wan2.1-vace-plus",
    size: None,
    function: Some("video_edit"),
    prompt_required: true,
    supports_negative_prompt: false,
    supports_prompt_extend: true,
    url_fields: &["video_url", "mask_image_url", "mask_video_url"],
    required_url_fields: &["video_url"],
    url_list: None,
    control_conditions: &["posebodyface", "depth"],
    control_required: false,
    templates: &[],
    batch: None,
    extra_inputs: &["mask_frame_id"],
    extra_parameters: &["mask_type", "expand_ratio", "expand_mode"],
    file_prefix: "wan_vace_video_edit",
};

pub static VACE_VIDEO_EXTENSION: ModePreset = ModePreset {
    mode: Mode::VaceVideoExtension,
    label: "VACE video extension",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: VACE_MODELS,
    default_model: "wan2.1-vace-plus",
    size: None,
    function: Some("video_extension"),
    prompt_required: true,
    supports_negative_prompt: false,
    supports_prompt_extend: true,
    url_fields: &[
        "first_frame_url",
        "last_frame_url",
        "first_clip_url",
        "last_clip_url",
        "video_url",
    ],
    required_url_fields: &[],
    url_list: None,
    control_conditions: POSE_CONTROLS,
    control_required: false,
    templates: &[],
    batch: None,
    extra_inputs: &[],
    extra_parameters: &[],
    file_prefix: "wan_vace_video_extension",
};

pub static VACE_VIDEO_OUTPAINTING: ModePreset = ModePreset {
    mode: Mode::VaceVideoOutpainting,
    label: "VACE video outpainting",
    service: Service::VideoSynthesis,
    media: MediaKind::Video,
    models: VACE_MODELS,
    default_model: "wan2.1-vace-plus",
    size: None,
    function: Some("video_outpainting"),
    prompt_required: true,
    supports_negative_prompt: false,
    supports_prompt_extend: true,
    url_fields: &["video_url"],
    required_url_fields: &["video_url"],
    url_list: None,
    control_conditions: &[],
    control_required: false,
    templates: &[],
    batch: None,
    extra_inputs: &[],
    extra_parameters: &["top_scale", "bottom_scale", "left_scale", "right_scale"],
    file_prefix: "wan_vace_video_outpainting",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_matches_its_mode() {
        for mode in Mode::all() {
            let preset = mode.preset();
            assert_eq!(preset.mode, mode);
            assert!(preset.allows_model(preset.default_model), "{mode}");
            if let Some(size) = &preset.size {
                assert!(size.options.contains(&size.default), "{mode}");
            }
            for field in preset.required_url_fields {
                assert!(preset.url_fields.contains(field), "{mode}: {field}");
            }
        }
    }

    #[test]
    fn test_poll_policy_by_media() {
        let image = Mode::TextToImage.preset().poll_policy();
        assert_eq!(image.interval, Duration::from_secs(5));
        assert_eq!(image.max_attempts, 30);

        let video = Mode::VaceVideoExtension.preset().poll_policy();
        assert_eq!(video.interval, Duration::from_secs(10));
        assert_eq!(video.max_attempts, 60);
    }

    #[test]
    fn test_only_image_modes_emit_batch_size() {
        for mode in Mode::all() {
            let preset = mode.preset();
            assert_eq!(preset.batch.is_some(), preset.media == MediaKind::Image, "{mode}");
        }
    }
}
