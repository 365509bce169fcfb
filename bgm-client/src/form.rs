//! Form state holder
//!
//! Owns every user-editable submission parameter. Mutators take raw input as
//! typed by the user, coerce it, and silently keep the previous value when the
//! input does not parse or is out of range; they report acceptance as a `bool`
//! and never fail. `validate()` re-checks everything before submission.

use crate::error::ValidationError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Shortest video the service renders (seconds)
pub const MIN_DURATION_SECS: u32 = 60;
/// Longest video the service renders (seconds)
pub const MAX_DURATION_SECS: u32 = 1800;
pub const DEFAULT_DURATION_SECS: u32 = 600;

/// Upper bound for fade in/out (seconds); lower bound is 0
pub const MAX_FADE_SECS: u32 = 10;
pub const DEFAULT_FADE_SECS: u32 = 2;

/// A user-selected local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent in the multipart part
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string())
    }
}

/// Playback speed adjustment offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyFactor {
    Slower,
    SlightlySlower,
    SlightlyFaster,
    Faster,
}

impl FrequencyFactor {
    pub const ALL: [FrequencyFactor; 4] = [
        FrequencyFactor::Slower,
        FrequencyFactor::SlightlySlower,
        FrequencyFactor::SlightlyFaster,
        FrequencyFactor::Faster,
    ];

    pub fn factor(self) -> f64 {
        match self {
            FrequencyFactor::Slower => 0.75,
            FrequencyFactor::SlightlySlower => 0.9,
            FrequencyFactor::SlightlyFaster => 1.1,
            FrequencyFactor::Faster => 1.25,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FrequencyFactor::Slower => "Slower (0.75x)",
            FrequencyFactor::SlightlySlower => "Slightly slower (0.9x)",
            FrequencyFactor::SlightlyFaster => "Slightly faster (1.1x)",
            FrequencyFactor::Faster => "Faster (1.25x)",
        }
    }

    /// Match a numeric factor against the offered set
    pub fn from_factor(value: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| (f.factor() - value).abs() < 1e-9)
    }
}

/// Frequency optimization profile understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioProfile {
    #[default]
    Default,
    Work,
    Relax,
    Focus,
}

impl AudioProfile {
    pub const ALL: [AudioProfile; 4] = [
        AudioProfile::Default,
        AudioProfile::Work,
        AudioProfile::Relax,
        AudioProfile::Focus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AudioProfile::Default => "default",
            AudioProfile::Work => "work",
            AudioProfile::Relax => "relax",
            AudioProfile::Focus => "focus",
        }
    }
}

impl FromStr for AudioProfile {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

/// All user-editable parameters of one submission
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    audio_file: Option<MediaFile>,
    image_file: Option<MediaFile>,
    duration_seconds: u32,
    frequency_factor: Option<FrequencyFactor>,
    fade_in_seconds: u32,
    fade_out_seconds: u32,
    motion_enabled: bool,
    audio_profile: AudioProfile,
    frequency_optimization_enabled: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            audio_file: None,
            image_file: None,
            duration_seconds: DEFAULT_DURATION_SECS,
            frequency_factor: None,
            fade_in_seconds: DEFAULT_FADE_SECS,
            fade_out_seconds: DEFAULT_FADE_SECS,
            motion_enabled: false,
            audio_profile: AudioProfile::Default,
            frequency_optimization_enabled: false,
        }
    }
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn audio_file(&self) -> Option<&MediaFile> {
        self.audio_file.as_ref()
    }

    pub fn image_file(&self) -> Option<&MediaFile> {
        self.image_file.as_ref()
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn frequency_factor(&self) -> Option<FrequencyFactor> {
        self.frequency_factor
    }

    pub fn fade_in_seconds(&self) -> u32 {
        self.fade_in_seconds
    }

    pub fn fade_out_seconds(&self) -> u32 {
        self.fade_out_seconds
    }

    pub fn motion_enabled(&self) -> bool {
        self.motion_enabled
    }

    pub fn audio_profile(&self) -> AudioProfile {
        self.audio_profile
    }

    pub fn frequency_optimization_enabled(&self) -> bool {
        self.frequency_optimization_enabled
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Select the audio file; an empty path is ignored
    pub fn select_audio_file(&mut self, path: impl Into<PathBuf>) -> bool {
        match non_empty_path(path.into()) {
            Some(path) => {
                self.audio_file = Some(MediaFile::new(path));
                true
            }
            None => false,
        }
    }

    /// Select the optional image file; an empty path is ignored
    pub fn select_image_file(&mut self, path: impl Into<PathBuf>) -> bool {
        match non_empty_path(path.into()) {
            Some(path) => {
                self.image_file = Some(MediaFile::new(path));
                true
            }
            None => false,
        }
    }

    pub fn clear_image_file(&mut self) {
        self.image_file = None;
    }

    /// Set duration from whole minutes (1-30)
    pub fn set_duration_minutes(&mut self, input: &str) -> bool {
        match parse_int(input).and_then(|m| m.checked_mul(60)) {
            Some(seconds) => self.set_duration_seconds(seconds),
            None => false,
        }
    }

    /// Set duration in seconds (60-1800)
    pub fn set_duration_seconds(&mut self, seconds: i64) -> bool {
        match in_range(seconds, MIN_DURATION_SECS, MAX_DURATION_SECS) {
            Some(v) => {
                self.duration_seconds = v;
                true
            }
            None => false,
        }
    }

    /// Set the frequency adjustment; empty input means "no adjustment"
    pub fn set_frequency(&mut self, input: &str) -> bool {
        let input = input.trim();
        if input.is_empty() {
            self.frequency_factor = None;
            return true;
        }

        match input.parse::<f64>().ok().and_then(FrequencyFactor::from_factor) {
            Some(factor) => {
                self.frequency_factor = Some(factor);
                true
            }
            None => false,
        }
    }

    pub fn set_frequency_factor(&mut self, factor: Option<FrequencyFactor>) {
        self.frequency_factor = factor;
    }

    pub fn set_fade_in(&mut self, input: &str) -> bool {
        match parse_int(input).and_then(|v| in_range(v, 0, MAX_FADE_SECS)) {
            Some(v) => {
                self.fade_in_seconds = v;
                true
            }
            None => false,
        }
    }

    pub fn set_fade_out(&mut self, input: &str) -> bool {
        match parse_int(input).and_then(|v| in_range(v, 0, MAX_FADE_SECS)) {
            Some(v) => {
                self.fade_out_seconds = v;
                true
            }
            None => false,
        }
    }

    pub fn set_motion_enabled(&mut self, enabled: bool) {
        self.motion_enabled = enabled;
    }

    /// Set the audio profile by name (case-insensitive); unknown names are ignored
    pub fn set_audio_profile(&mut self, input: &str) -> bool {
        match input.parse::<AudioProfile>() {
            Ok(profile) => {
                self.audio_profile = profile;
                true
            }
            Err(()) => false,
        }
    }

    pub fn set_frequency_optimization_enabled(&mut self, enabled: bool) {
        self.frequency_optimization_enabled = enabled;
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check the form is ready for submission
    ///
    /// Bounds are re-checked even though the mutators enforce them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.audio_file.is_none() {
            return Err(ValidationError::NoAudioFile);
        }

        check_range("duration", self.duration_seconds, MIN_DURATION_SECS, MAX_DURATION_SECS)?;
        check_range("fade_in", self.fade_in_seconds, 0, MAX_FADE_SECS)?;
        check_range("fade_out", self.fade_out_seconds, 0, MAX_FADE_SECS)?;

        Ok(())
    }
}

fn non_empty_path(path: PathBuf) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

fn parse_int(input: &str) -> Option<i64> {
    input.trim().parse::<i64>().ok()
}

fn in_range(value: i64, min: u32, max: u32) -> Option<u32> {
    if value < i64::from(min) || value > i64::from(max) {
        None
    } else {
        u32::try_from(value).ok()
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value: i64::from(value),
            min: i64::from(min),
            max: i64::from(max),
        });
    }
    Ok(())
}
