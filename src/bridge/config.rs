//! Bridge configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default RTMP publish target
pub const DEFAULT_OUTPUT_URL: &str = "rtmp://localhost:1935/live/stream";

/// ffmpeg invocation and lifecycle timeouts
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// ffmpeg executable
    pub program: PathBuf,

    /// Container format of the incoming chunks
    pub input_format: String,

    /// Output video codec
    pub video_codec: String,

    /// Output audio codec
    pub audio_codec: String,

    /// x264 preset
    pub preset: String,

    /// x264 tune
    pub tune: String,

    /// Video bitrate (ffmpeg syntax, e.g. "1000k")
    pub video_bitrate: String,

    /// Audio bitrate (ffmpeg syntax, e.g. "128k")
    pub audio_bitrate: String,

    /// Output container format
    pub output_format: String,

    /// Where the re-encoded stream is published
    pub output_url: String,

    /// How long a spawn may take before it is treated as failed
    pub start_timeout: Duration,

    /// How long a graceful stop may take before the process is killed
    pub stop_timeout: Duration,

    /// Chunks that may wait for the encoder's stdin before new ones are dropped
    pub input_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            input_format: "webm".into(),
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            preset: "veryfast".into(),
            tune: "zerolatency".into(),
            video_bitrate: "1000k".into(),
            audio_bitrate: "128k".into(),
            output_format: "flv".into(),
            output_url: DEFAULT_OUTPUT_URL.into(),
            start_timeout: Duration::from_secs(10),
            stop_timeout: Duration::from_secs(5),
            input_buffer: 64,
        }
    }
}

impl BridgeConfig {
    /// Create a config publishing to `url`
    pub fn with_output(url: impl Into<String>) -> Self {
        Self {
            output_url: url.into(),
            ..Default::default()
        }
    }

    /// Set the ffmpeg executable
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the publish target
    pub fn output_url(mut self, url: impl Into<String>) -> Self {
        self.output_url = url.into();
        self
    }

    /// Set video and audio bitrates
    pub fn bitrates(mut self, video: impl Into<String>, audio: impl Into<String>) -> Self {
        self.video_bitrate = video.into();
        self.audio_bitrate = audio.into();
        self
    }

    /// Set the spawn timeout
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Set the graceful stop timeout
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the input queue depth, in chunks
    pub fn input_buffer(mut self, chunks: usize) -> Self {
        self.input_buffer = chunks.max(1);
        self
    }

    /// ffmpeg arguments: read chunks from stdin, publish to `output_url`
    pub fn args(&self) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "warning".into(),
            "-f".into(),
            self.input_format.clone(),
            "-i".into(),
            "pipe:0".into(),
            "-c:v".into(),
            self.video_codec.clone(),
            "-c:a".into(),
            self.audio_codec.clone(),
            "-preset".into(),
            self.preset.clone(),
            "-tune".into(),
            self.tune.clone(),
            "-b:v".into(),
            self.video_bitrate.clone(),
            "-b:a".into(),
            self.audio_bitrate.clone(),
            "-f".into(),
            self.output_format.clone(),
            self.output_url.clone(),
        ]
    }
}
