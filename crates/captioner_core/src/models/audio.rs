//! Audio mix planning structures.

use serde::{Deserialize, Serialize};

use super::enums::MixDurationPolicy;

/// Where an audio track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    /// The primary video's own audio stream.
    Original,
    /// Spoken narration.
    Dialogue,
    /// Background music (ducked under dialogue).
    Music,
}

/// One track contributing to the audio mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Which input this track is.
    pub source: AudioSource,
    /// Engine input index the audio stream is read from.
    pub input_index: usize,
    /// Gain applied to the track in dB (0 = unity).
    pub volume_db: f64,
    /// Fade-in length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in_secs: Option<f64>,
    /// Fade-out length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out_secs: Option<f64>,
    /// Probed duration of the track in seconds.
    pub duration_secs: f64,
    /// Cut the track at this length before fading (bounded renders).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_to_secs: Option<f64>,
}

impl AudioTrack {
    /// Create a track at unity gain with no fades.
    pub fn new(source: AudioSource, input_index: usize, duration_secs: f64) -> Self {
        Self {
            source,
            input_index,
            volume_db: 0.0,
            fade_in_secs: None,
            fade_out_secs: None,
            duration_secs,
            trim_to_secs: None,
        }
    }

    /// Set the gain in dB.
    pub fn with_volume_db(mut self, volume_db: f64) -> Self {
        self.volume_db = volume_db;
        self
    }

    /// Set fade-in and fade-out lengths (zero or negative disables a fade).
    pub fn with_fades(mut self, fade_in_secs: f64, fade_out_secs: f64) -> Self {
        self.fade_in_secs = (fade_in_secs > 0.0).then_some(fade_in_secs);
        self.fade_out_secs = (fade_out_secs > 0.0).then_some(fade_out_secs);
        self
    }

    /// Trim the track when it runs longer than `max_secs`.
    pub fn trimmed_to(mut self, max_secs: f64) -> Self {
        if max_secs > 0.0 && self.duration_secs > max_secs {
            self.trim_to_secs = Some(max_secs);
        }
        self
    }

    /// Length of the track after trimming.
    pub fn effective_duration(&self) -> f64 {
        match self.trim_to_secs {
            Some(trim) => trim.min(self.duration_secs),
            None => self.duration_secs,
        }
    }

    /// Start of the fade-out, clamped to the beginning of the track.
    pub fn fade_out_start(&self) -> Option<f64> {
        self.fade_out_secs
            .map(|fade| (self.effective_duration() - fade).max(0.0))
    }
}

/// Plan for the audio half of the filter graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioMixPlan {
    /// Tracks in mix order; the first one is the primary track.
    pub tracks: Vec<AudioTrack>,
    /// How mismatched lengths resolve when two or more tracks mix.
    pub duration_policy: MixDurationPolicy,
}

impl AudioMixPlan {
    /// Create an empty plan.
    pub fn new(duration_policy: MixDurationPolicy) -> Self {
        Self {
            tracks: Vec::new(),
            duration_policy,
        }
    }

    /// Add a track (builder pattern).
    pub fn with_track(mut self, track: AudioTrack) -> Self {
        self.tracks.push(track);
        self
    }

    /// Whether no new audio is supplied.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Whether the tracks need a mix operation (two or more).
    pub fn needs_mix(&self) -> bool {
        self.tracks.len() >= 2
    }

    /// Expected length of the mixed audio in seconds.
    pub fn expected_duration(&self) -> Option<f64> {
        let durations = self.tracks.iter().map(AudioTrack::effective_duration);
        match self.tracks.len() {
            0 => None,
            1 => self.tracks.first().map(AudioTrack::effective_duration),
            _ => match self.duration_policy {
                MixDurationPolicy::Shortest => durations.reduce(f64::min),
                MixDurationPolicy::Longest => durations.reduce(f64::max),
                MixDurationPolicy::First => self.tracks.first().map(AudioTrack::effective_duration),
            },
        }
    }
}
