//! Per-skin declarative configuration
//!
//! Skins describe what the pet does (states, idle actions, triggers,
//! interactions, sounds) so the engine stays free of hardcoded behavior.
//! Configs are serde-derived and usually shipped as TOML next to the skin
//! assets. Validation is deliberately lax: unknown state names are refused
//! at transition time, not at load time, so a malformed skin degrades to a
//! pet that ignores the broken parts instead of crashing.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{PetError, Result};

/// A candidate for the weighted-random idle draw
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleAction {
    pub state: String,
    /// Relative selection weight; non-positive weights are never drawn
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// How long the pet holds the state before auto-reverting
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Logical sound id played when the state is entered
    #[serde(default)]
    pub sound: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

/// Bounds for the random delay before an idle action fires
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdleTimeout {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// What a trigger does when its condition matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerAction {
    #[serde(default)]
    pub state: Option<String>,
    /// Length of the forced block; the engine reverts when it expires
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// A condition/action rule evaluated periodically by the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Boolean expression over context variables, e.g. `"idleTime > 5000"`
    pub condition: String,
    pub action: TriggerAction,
}

/// Response to a named user interaction (`click`, `drag`, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionSpec {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Behavior description for one skin, immutable for an engine's lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Valid state names; the engine always adds `"idle"` if missing
    pub states: Vec<String>,
    #[serde(default)]
    pub idle_actions: Vec<IdleAction>,
    pub idle_timeout: IdleTimeout,
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
    #[serde(default)]
    pub interactions: AHashMap<String, InteractionSpec>,
}

impl Default for BehaviorConfig {
    /// Built-in cat-like behavior used when a skin ships no config
    ///
    /// Idle weights 30/20/20 (sleep/dance/interact) make spontaneous naps
    /// the most common idle action. Durations are short enough that the pet
    /// never looks stuck; the 10-30s idle window keeps it from feeling
    /// hyperactive.
    fn default() -> Self {
        let mut interactions = AHashMap::new();
        interactions.insert(
            "click".to_string(),
            InteractionSpec {
                state: Some("interact".to_string()),
                sound: Some("meow".to_string()),
                duration_ms: Some(3000),
            },
        );
        interactions.insert(
            "drag".to_string(),
            InteractionSpec {
                state: Some("drag".to_string()),
                sound: None,
                duration_ms: None,
            },
        );

        Self {
            states: vec![
                "idle".to_string(),
                "sleep".to_string(),
                "dance".to_string(),
                "interact".to_string(),
                "drag".to_string(),
                "submissive".to_string(),
                "angry".to_string(),
            ],
            idle_actions: vec![
                IdleAction {
                    state: "sleep".to_string(),
                    weight: 30.0,
                    duration_ms: Some(8000),
                    sound: Some("purr".to_string()),
                },
                IdleAction {
                    state: "dance".to_string(),
                    weight: 20.0,
                    duration_ms: Some(4000),
                    sound: None,
                },
                IdleAction {
                    state: "interact".to_string(),
                    weight: 20.0,
                    duration_ms: Some(3000),
                    sound: Some("meow".to_string()),
                },
            ],
            idle_timeout: IdleTimeout {
                min_ms: 10_000,
                max_ms: 30_000,
            },
            triggers: Vec::new(),
            interactions,
        }
    }
}

/// Load a behavior config from a TOML file
pub fn load_behavior_config(path: &Path) -> Result<BehaviorConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| PetError::Config(format!("{}: {}", path.display(), e)))
}

/// Range for the random gap between delayed-repeat ambience playthroughs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoopDelay {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// A configured sound reference: a bare path, alternative paths (one chosen
/// uniformly at random each play), or a detailed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoundSource {
    Path(String),
    Variants(Vec<String>),
    Detailed {
        #[serde(default)]
        src: Option<String>,
        #[serde(default)]
        srcs: Vec<String>,
        #[serde(rename = "loop", default)]
        looped: bool,
        #[serde(default = "default_volume")]
        volume: f32,
        #[serde(default = "default_rate")]
        playback_rate: f32,
        #[serde(default)]
        loop_delay: Option<LoopDelay>,
    },
}

fn default_volume() -> f32 {
    1.0
}

fn default_rate() -> f32 {
    1.0
}

/// Normalized form every `SoundSource` resolves to
#[derive(Debug, Clone)]
pub struct SoundEntry {
    pub variants: Vec<String>,
    pub looped: bool,
    pub volume: f32,
    pub playback_rate: f32,
    pub loop_delay: Option<LoopDelay>,
}

impl SoundSource {
    pub fn normalize(&self) -> SoundEntry {
        match self {
            SoundSource::Path(p) => SoundEntry {
                variants: vec![p.clone()],
                looped: false,
                volume: 1.0,
                playback_rate: 1.0,
                loop_delay: None,
            },
            SoundSource::Variants(paths) => SoundEntry {
                variants: paths.clone(),
                looped: false,
                volume: 1.0,
                playback_rate: 1.0,
                loop_delay: None,
            },
            SoundSource::Detailed {
                src,
                srcs,
                looped,
                volume,
                playback_rate,
                loop_delay,
            } => {
                let mut variants = Vec::new();
                if let Some(s) = src {
                    variants.push(s.clone());
                }
                variants.extend(srcs.iter().cloned());
                SoundEntry {
                    variants,
                    looped: *looped,
                    volume: *volume,
                    playback_rate: *playback_rate,
                    loop_delay: *loop_delay,
                }
            }
        }
    }
}

/// Everything a skin supplies to the core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinConfig {
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub sounds: AHashMap<String, SoundSource>,
    /// Absent means "keep the built-in default behavior"
    #[serde(default)]
    pub behaviors: Option<BehaviorConfig>,
}

/// Supplies the active skin; swapping skins at runtime rebuilds the
/// engine/scheduler pair and reloads every sound.
pub trait SkinProvider {
    fn current_skin(&self) -> SkinConfig;
}
