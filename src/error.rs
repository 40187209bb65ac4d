use std::fmt;

#[derive(Debug)]
pub enum SonifyError {
    Config(ConfigError),
    Preset(PresetError),
}

/// Errors in the sonification configuration itself. These are raised
/// synchronously by the note builder before any audio work happens.
#[derive(Debug)]
pub enum ConfigError {
    NonPositiveStepDuration { value: f64 },
    ZeroMasterLength,
}

/// Errors resolving or decoding an instrument preset. A preset that fails
/// to load never falls back to a substitute sound — the whole start/render
/// call fails and the caller surfaces it.
#[derive(Debug)]
pub enum PresetError {
    UnknownPreset { name: String },
    Fetch { name: String, reason: String },
    Decode { name: String, reason: String },
    ChecksumMismatch { name: String },
}

impl fmt::Display for SonifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SonifyError::Config(e) => write!(f, "Configuration error: {e}"),
            SonifyError::Preset(e) => write!(f, "Preset error: {e}"),
        }
    }
}

impl std::error::Error for SonifyError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveStepDuration { value } => {
                write!(f, "stepDuration must be a positive number of seconds, got {value}")
            }
            ConfigError::ZeroMasterLength => {
                write!(f, "masterLength must be at least 1 frame")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset { name } => {
                write!(f, "Preset '{name}' is not loaded in this session")
            }
            PresetError::Fetch { name, reason } => {
                write!(f, "Failed to fetch preset '{name}': {reason}")
            }
            PresetError::Decode { name, reason } => {
                write!(f, "Failed to decode preset '{name}': {reason}")
            }
            PresetError::ChecksumMismatch { name } => {
                write!(f, "Preset '{name}' audio data did not match its catalog checksum")
            }
        }
    }
}

impl std::error::Error for PresetError {}

impl From<ConfigError> for SonifyError {
    fn from(e: ConfigError) -> Self {
        SonifyError::Config(e)
    }
}

impl From<PresetError> for SonifyError {
    fn from(e: PresetError) -> Self {
        SonifyError::Preset(e)
    }
}
