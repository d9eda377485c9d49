use anyhow::Result;
use serde::Deserialize;

use crate::transcription::AccumulationPolicy;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub credentials: CredentialsConfig,
    pub speech: SpeechConfig,
    pub capture: CaptureSettings,
    pub transcript: TranscriptSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    /// Path to the local authorized-user credentials file
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechConfig {
    /// Recognize endpoint URL
    pub endpoint: String,
    /// BCP-47 language code
    pub language_code: String,
    /// Engine encoding name for submitted audio
    pub encoding: String,
    /// Sample rate of submitted audio
    pub sample_rate_hertz: u32,
}

#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptSettings {
    /// Accumulation policy: "replace" or "append"
    pub policy: AccumulationPolicy,
    pub interim_results: bool,
    pub continuous: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
