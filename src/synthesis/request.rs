use super::{AvatarStyle, SubtitleType, SynthesisError, VideoCodec, VideoFormat, Voice};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_DISPLAY_NAME: &str = "Simple avatar synthesis";
pub const DEFAULT_DESCRIPTION: &str = "Simple avatar synthesis description";
pub const DEFAULT_CHARACTER: &str = "lisa";
const TRANSPARENT: &str = "transparent";

/// Video settings sent alongside the text. Everything except voice and style
/// is fixed per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputOptions {
    pub video_format: VideoFormat,
    pub video_codec: VideoCodec,
    pub subtitle_type: SubtitleType,
    pub background_color: String,
    pub hand_movements: Option<String>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            video_format: VideoFormat::Webm,
            video_codec: VideoCodec::Vp9,
            subtitle_type: SubtitleType::SoftEmbedded,
            background_color: TRANSPARENT.to_string(),
            hand_movements: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    voice: Voice,
    style: AvatarStyle,
    character: String,
    options: OutputOptions,
    display_name: String,
    description: String,
    custom_voices: HashMap<String, String>,
}

pub struct SynthesisRequestBuilder {
    text: String,
    voice: Voice,
    style: AvatarStyle,
    character: String,
    options: OutputOptions,
    display_name: String,
    description: String,
    custom_voices: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitPayload<'a> {
    display_name: &'a str,
    description: &'a str,
    text_type: &'static str,
    synthesis_config: SynthesisConfigPayload<'a>,
    custom_voices: &'a HashMap<String, String>,
    inputs: Vec<InputPayload<'a>>,
    properties: PropertiesPayload<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisConfigPayload<'a> {
    voice: &'a str,
}

#[derive(Debug, Serialize)]
struct InputPayload<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PropertiesPayload<'a> {
    customized: bool,
    talking_avatar_character: &'a str,
    talking_avatar_style: &'a str,
    video_format: VideoFormat,
    video_codec: VideoCodec,
    subtitle_type: SubtitleType,
    background_color: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hand_movements: Option<&'a str>,
}

impl SynthesisRequest {
    pub fn builder(text: impl Into<String>) -> SynthesisRequestBuilder {
        SynthesisRequestBuilder::new(text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }

    pub fn style(&self) -> AvatarStyle {
        self.style
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    pub(crate) fn payload(&self) -> SubmitPayload<'_> {
        SubmitPayload {
            display_name: &self.display_name,
            description: &self.description,
            text_type: "PlainText",
            synthesis_config: SynthesisConfigPayload {
                voice: self.voice.as_str(),
            },
            custom_voices: &self.custom_voices,
            inputs: vec![InputPayload { text: &self.text }],
            properties: PropertiesPayload {
                customized: false,
                talking_avatar_character: &self.character,
                talking_avatar_style: self.style.as_str(),
                video_format: self.options.video_format,
                video_codec: self.options.video_codec,
                subtitle_type: self.options.subtitle_type,
                background_color: &self.options.background_color,
                hand_movements: self.options.hand_movements.as_deref(),
            },
        }
    }

    /// Wire body for the submit call.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.payload())
    }
}

impl SynthesisRequestBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: Voice::default(),
            style: AvatarStyle::default(),
            character: DEFAULT_CHARACTER.to_string(),
            options: OutputOptions::default(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            custom_voices: HashMap::new(),
        }
    }

    pub fn voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn style(mut self, style: AvatarStyle) -> Self {
        self.style = style;
        self
    }

    pub fn options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Maps a custom voice name to its deployment id.
    pub fn custom_voice(mut self, name: impl Into<String>, deployment_id: impl Into<String>) -> Self {
        self.custom_voices.insert(name.into(), deployment_id.into());
        self
    }

    pub fn build(self) -> Result<SynthesisRequest, SynthesisError> {
        if self.text.trim().is_empty() {
            return Err(SynthesisError::invalid_input("text must not be empty"));
        }
        // the service only renders alpha channels into webm/vp9
        if self.options.background_color.eq_ignore_ascii_case(TRANSPARENT)
            && (self.options.video_format != VideoFormat::Webm
                || self.options.video_codec != VideoCodec::Vp9)
        {
            return Err(SynthesisError::invalid_input(
                "transparent background requires webm format with vp9 codec",
            ));
        }
        Ok(SynthesisRequest {
            text: self.text,
            voice: self.voice,
            style: self.style,
            character: self.character,
            options: self.options,
            display_name: self.display_name,
            description: self.description,
            custom_voices: self.custom_voices,
        })
    }
}
