//! Optional stream probe
//!
//! Stream probing itself lives outside this crate. When a probe is plugged in
//! its dimensions and codec lists take precedence over filename tokens.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_codecs: Vec<String>,
    pub audio_codecs: Vec<String>,
    pub subtitle_languages: Vec<String>,
}

#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<Option<ProbeInfo>>;
}

/// Probe that never returns stream data
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

#[async_trait]
impl MediaProbe for NoProbe {
    async fn probe(&self, _path: &Path) -> Result<Option<ProbeInfo>> {
        Ok(None)
    }
}
