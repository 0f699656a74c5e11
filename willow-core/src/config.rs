use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub script_path: String,
    pub save_path:   String,
    pub log_path:    String,
    pub log_level:   String,
    /// Node the launcher starts a fresh story from.
    pub start_node:  String,
}

/// Text pacing. `text_speed` drives the character reveal; the other three
/// shape auto and fast-forward playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Characters revealed per second.
    pub text_speed: f32,
    /// Seconds of reading time credited per character when auto mode waits
    /// on a finished line.
    pub time_per_character: f32,
    /// Multiplier on the computed reading time in auto mode.
    pub auto_forward_factor: f32,
    /// Seconds between lines while fast-forwarding.
    pub fast_forward_interval: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub music_volume: f32,
    pub sound_volume: f32,
    pub mute_all:     bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            script_path: "game/".into(),
            save_path:   "saves/".into(),
            log_path:    "logs/".into(),
            log_level:   "info".into(),
            start_node:  "Start".into(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            text_speed: 40.0,
            time_per_character: 0.1,
            auto_forward_factor: 0.5,
            fast_forward_interval: 0.25,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            music_volume: 0.7,
            sound_volume: 0.8,
            mute_all: false,
        }
    }
}
