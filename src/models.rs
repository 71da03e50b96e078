//! Data models and configuration
//!
//! Defines the request-scoped generation inputs (tone, creativity, product
//! description) and the environment-driven application configuration.

use crate::diffusion::DeviceChoice;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    Friendly,
    Professional,
    Playful,
    Luxury,
    TechSavvy,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Friendly,
        Tone::Professional,
        Tone::Playful,
        Tone::Luxury,
        Tone::TechSavvy,
    ];

    /// Label shown in the tone selector.
    pub fn label(self) -> &'static str {
        match self {
            Tone::Friendly => "Friendly",
            Tone::Professional => "Professional",
            Tone::Playful => "Playful",
            Tone::Luxury => "Luxury",
            Tone::TechSavvy => "Tech-Savvy",
        }
    }

    /// Form and CLI value, e.g. `tech-savvy`.
    pub fn value(self) -> &'static str {
        match self {
            Tone::Friendly => "friendly",
            Tone::Professional => "professional",
            Tone::Playful => "playful",
            Tone::Luxury => "luxury",
            Tone::TechSavvy => "tech-savvy",
        }
    }

    /// Word embedded in the copy prompt.
    pub fn prompt_word(self) -> String {
        self.label().to_lowercase()
    }
}

impl Default for Tone {
    fn default() -> Self {
        Tone::Friendly
    }
}

impl FromStr for Tone {
    type Err = Error;

    /// Accepts the form value (`tech-savvy`) or the label (`Tech-Savvy`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.value().eq_ignore_ascii_case(s) || tone.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Validation(format!("unknown tone '{}'", s)))
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sampling temperature for copy generation, bounded by the creativity slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Creativity(f64);

impl Creativity {
    pub const MIN: f64 = 0.2;
    pub const MAX: f64 = 1.0;
    pub const STEP: f64 = 0.05;
    pub const DEFAULT: f64 = 0.8;

    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(Error::Validation(format!(
                "creativity must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Creativity {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for Creativity {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Creativity> for f64 {
    fn from(creativity: Creativity) -> f64 {
        creativity.0
    }
}

impl FromStr for Creativity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("creativity '{}' is not a number", s)))?;
        Self::new(value)
    }
}

impl fmt::Display for Creativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// One user-triggered generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    description: String,
    tone: Tone,
    creativity: Creativity,
}

impl GenerationRequest {
    /// Build a request; a blank product description is rejected.
    pub fn new(description: impl Into<String>, tone: Tone, creativity: Creativity) -> Result<Self> {
        let description = description.into();
        if is_blank(&description) {
            return Err(Error::Validation(
                "product description must not be empty".to_string(),
            ));
        }
        Ok(Self {
            description,
            tone,
            creativity,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn creativity(&self) -> Creativity {
        self.creativity
    }
}

/// Whitespace-only descriptions never trigger generation.
pub fn is_blank(description: &str) -> bool {
    description.trim().is_empty()
}

// Configuration
pub const DEFAULT_COPY_MODEL: &str = "shisa-ai/shisa-v2-llama3.3-70b:free";
pub const DEFAULT_COPY_API_BASE: &str = "https://openrouter.ai/api";
pub const DEFAULT_DIFFUSION_API_BASE: &str = "http://127.0.0.1:8080";
pub const DEFAULT_DIFFUSION_MODEL: &str = "runwayml/stable-diffusion-v1-5";
pub const DEFAULT_GUIDANCE_SCALE: f32 = 7.5;

#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub copy_model: String,
    pub copy_api_base: String,
    pub copy_timeout: Duration,
    pub diffusion_api_base: String,
    pub diffusion_model: String,
    pub diffusion_device: DeviceChoice,
    pub diffusion_timeout: Duration,
    pub guidance_scale: f32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let openrouter_api_key = lookup("OPENROUTER_API_KEY").unwrap_or_default();
        if openrouter_api_key.is_empty() {
            tracing::warn!("OPENROUTER_API_KEY not set; copy requests will be unauthenticated");
        }

        let guidance_scale: f32 = parse_var("GUIDANCE_SCALE", &var("GUIDANCE_SCALE", "7.5"))?;
        if !guidance_scale.is_finite() || guidance_scale <= 0.0 {
            return Err(Error::Config(format!(
                "GUIDANCE_SCALE must be a positive number, got {}",
                guidance_scale
            )));
        }

        Ok(Self {
            openrouter_api_key,
            copy_model: var("COPY_MODEL", DEFAULT_COPY_MODEL),
            copy_api_base: var("COPY_API_BASE", DEFAULT_COPY_API_BASE),
            copy_timeout: Duration::from_secs(parse_var(
                "COPY_TIMEOUT_SECS",
                &var("COPY_TIMEOUT_SECS", "60"),
            )?),
            diffusion_api_base: var("DIFFUSION_API_BASE", DEFAULT_DIFFUSION_API_BASE),
            diffusion_model: var("DIFFUSION_MODEL", DEFAULT_DIFFUSION_MODEL),
            diffusion_device: parse_var("DIFFUSION_DEVICE", &var("DIFFUSION_DEVICE", "auto"))?,
            diffusion_timeout: Duration::from_secs(parse_var(
                "DIFFUSION_TIMEOUT_SECS",
                &var("DIFFUSION_TIMEOUT_SECS", "600"),
            )?),
            guidance_scale,
        })
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: '{}'", key, raw)))
}
