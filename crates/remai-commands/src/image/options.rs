use remai_agent::ImageRequest;
use remai_router::{CommandOptions, OptionError, OptionMap, OptionSpec};

use crate::middleware::PromptOptions;

pub const OPTION_PROMPT: &str = "prompt";
pub const OPTION_MODEL: &str = "model";
pub const OPTION_SIZE: &str = "size";
pub const OPTION_STYLE: &str = "style";
pub const OPTION_QUALITY: &str = "quality";

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            fn parse(option: &str, value: &str) -> Result<Self, OptionError> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|c| c.as_str() == value)
                    .ok_or_else(|| OptionError::Invalid {
                        name: option.to_string(),
                        reason: format!("unknown value '{value}'"),
                    })
            }
        }
    };
}

choice_enum!(ImageModel {
    DallE3 => "dall-e-3",
    DallE2 => "dall-e-2",
});

choice_enum!(
    /// Output size. The two models share only the 1024 square.
    ImageSize {
        Square256 => "256x256",
        Square512 => "512x512",
        Square1024 => "1024x1024",
        Wide => "1792x1024",
        Tall => "1024x1792",
    }
);

choice_enum!(ImageStyle {
    Natural => "natural",
    Vivid => "vivid",
});

choice_enum!(ImageQuality {
    Standard => "standard",
    Hd => "hd",
});

impl ImageSize {
    pub fn supported_by(&self, model: ImageModel) -> bool {
        match self {
            ImageSize::Square256 | ImageSize::Square512 => model == ImageModel::DallE2,
            ImageSize::Square1024 => true,
            ImageSize::Wide | ImageSize::Tall => model == ImageModel::DallE3,
        }
    }

    fn label(&self) -> String {
        match self {
            ImageSize::Square1024 => format!("{} (Default)", self.as_str()),
            ImageSize::Square256 | ImageSize::Square512 => format!("{} (v2 only)", self.as_str()),
            ImageSize::Wide | ImageSize::Tall => format!("{} (v3 only)", self.as_str()),
        }
    }
}

pub const DEFAULT_MODEL: ImageModel = ImageModel::DallE3;
pub const DEFAULT_SIZE: ImageSize = ImageSize::Square1024;
pub const DEFAULT_STYLE: ImageStyle = ImageStyle::Natural;
pub const DEFAULT_QUALITY: ImageQuality = ImageQuality::Standard;

/// Parsed options of one `image` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub prompt: String,
    pub model: ImageModel,
    pub size: ImageSize,
    /// Only dall-e-3 takes a style and a quality.
    pub style: Option<ImageStyle>,
    pub quality: Option<ImageQuality>,
}

impl ImageOptions {
    pub fn request(&self, user: Option<String>) -> ImageRequest {
        ImageRequest {
            prompt: self.prompt.clone(),
            model: self.model.as_str().to_string(),
            size: self.size.as_str().to_string(),
            n: 1,
            quality: self.quality.map(|q| q.as_str().to_string()),
            style: self.style.map(|s| s.as_str().to_string()),
            user,
        }
    }
}

impl CommandOptions for ImageOptions {
    fn from_options(options: &OptionMap) -> Result<Self, OptionError> {
        let prompt = options.required_string(OPTION_PROMPT)?;
        if prompt.trim().is_empty() {
            return Err(OptionError::Invalid {
                name: OPTION_PROMPT.to_string(),
                reason: "prompt cannot be empty".to_string(),
            });
        }

        let model = match options.string(OPTION_MODEL)? {
            Some(value) => ImageModel::parse(OPTION_MODEL, &value)?,
            None => DEFAULT_MODEL,
        };
        let size = match options.string(OPTION_SIZE)? {
            Some(value) => ImageSize::parse(OPTION_SIZE, &value)?,
            None => DEFAULT_SIZE,
        };
        if !size.supported_by(model) {
            return Err(OptionError::Invalid {
                name: OPTION_SIZE.to_string(),
                reason: format!("{} is not available for {}", size.as_str(), model.as_str()),
            });
        }

        let (style, quality) = if model == ImageModel::DallE3 {
            let style = match options.string(OPTION_STYLE)? {
                Some(value) => ImageStyle::parse(OPTION_STYLE, &value)?,
                None => DEFAULT_STYLE,
            };
            let quality = match options.string(OPTION_QUALITY)? {
                Some(value) => ImageQuality::parse(OPTION_QUALITY, &value)?,
                None => DEFAULT_QUALITY,
            };
            (Some(style), Some(quality))
        } else {
            (None, None)
        };

        Ok(Self {
            prompt,
            model,
            size,
            style,
            quality,
        })
    }
}

impl PromptOptions for ImageOptions {
    fn prompt(&self) -> &str {
        &self.prompt
    }
}

fn with_default(spec: OptionSpec, values: &[&'static str], default: &str) -> OptionSpec {
    values.iter().fold(spec, |spec, value| {
        let label = if *value == default {
            format!("{value} (Default)")
        } else {
            value.to_string()
        };
        spec.choice(label, *value)
    })
}

pub fn schema() -> Vec<OptionSpec> {
    let models: Vec<&str> = ImageModel::ALL.iter().map(ImageModel::as_str).collect();
    let styles: Vec<&str> = ImageStyle::ALL.iter().map(ImageStyle::as_str).collect();
    let qualities: Vec<&str> = ImageQuality::ALL.iter().map(ImageQuality::as_str).collect();

    let size = ImageSize::ALL.iter().fold(
        OptionSpec::string(OPTION_SIZE, "The size of the generated images"),
        |spec, size| spec.choice(size.label(), size.as_str()),
    );

    vec![
        OptionSpec::string(OPTION_PROMPT, "A text description of the desired image").required(),
        with_default(
            OptionSpec::string(OPTION_MODEL, "DALL·E model"),
            &models,
            DEFAULT_MODEL.as_str(),
        ),
        size,
        with_default(
            OptionSpec::string(OPTION_STYLE, "The style of the generated images (v3 only)"),
            &styles,
            DEFAULT_STYLE.as_str(),
        ),
        with_default(
            OptionSpec::string(OPTION_QUALITY, "The quality of the generated images (v3 only)"),
            &qualities,
            DEFAULT_QUALITY.as_str(),
        ),
    ]
}
