/// Error reported by a speech capture backend, identified by the
/// recognizer's error code (`no-speech`, `not-allowed`, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("speech recognition failed: {code}")]
pub struct VoiceError {
    code: String,
}

impl VoiceError {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Platform speech-to-text. `start` begins one recording; the final
/// transcript (or error) is then picked up by `poll_transcript`.
pub trait VoiceCapture {
    fn is_supported(&self) -> bool;
    fn start(&mut self) -> Result<(), VoiceError>;
    fn poll_transcript(&mut self) -> Option<Result<String, VoiceError>>;
}

/// Used where the platform has no speech backend.
#[derive(Debug, Default)]
pub struct NoVoiceCapture;

impl VoiceCapture for NoVoiceCapture {
    fn is_supported(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), VoiceError> {
        Err(VoiceError::new("unsupported"))
    }

    fn poll_transcript(&mut self) -> Option<Result<String, VoiceError>> {
        None
    }
}

/// The composer's pending text plus the recording indicator.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    text: String,
    recording: bool,
}

impl Draft {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    pub fn apply_transcript(&mut self, transcript: &str) {
        self.recording = false;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return;
        }
        self.append_separated(transcript);
    }

    pub fn voice_failed(&mut self, error: &VoiceError) {
        tracing::warn!("voice input error: {error}");
        self.recording = false;
    }

    pub fn attach(&mut self, name: &str, size_bytes: u64) {
        let token = attachment_token(name, size_bytes);
        self.append_separated(&token);
    }

    fn append_separated(&mut self, text: &str) {
        if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }
}

pub fn attachment_token(name: &str, size_bytes: u64) -> String {
    format!("[Attached: {name} ({})]", format_size(size_bytes))
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
