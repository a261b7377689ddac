// Environment signals consumed by the performance classifier
//
// ClassifierSignals is the fully-resolved snapshot the classifier evaluates.
// SignalProbe is what a host can actually report: every field is optional and
// resolve() substitutes the conservative defaults below for anything missing.

use serde::{Deserialize, Serialize};

/// Core count assumed when the host cannot report hardware concurrency
pub const DEFAULT_CPU_CORES: u32 = 4;

/// Device memory (GiB) assumed when the host cannot report it
pub const DEFAULT_DEVICE_MEMORY_GIB: f32 = 4.0;

/// Viewport width assumed when no layout information is available
pub const DEFAULT_VIEWPORT_WIDTH_PX: u32 = 1024;

/// User-agent fragments treated as mobile (matched case-insensitively)
const MOBILE_USER_AGENT_TOKENS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Effective network connection type as reported by the Network Information API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EffectiveConnectionType {
    #[serde(rename = "slow-2g", alias = "slow2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl EffectiveConnectionType {
    /// Parse a reported connection type; unrecognised values map to Unknown
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "slow-2g" | "slow2g" => Self::Slow2g,
            "2g" => Self::TwoG,
            "3g" => Self::ThreeG,
            "4g" => Self::FourG,
            _ => Self::Unknown,
        }
    }

    /// Whether this connection is slow enough to count as constrained
    pub fn is_constrained(self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slow2g => "slow-2g",
            Self::TwoG => "2g",
            Self::ThreeG => "3g",
            Self::FourG => "4g",
            Self::Unknown => "unknown",
        }
    }
}

/// Read-only snapshot of the hosting environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSignals {
    pub viewport_width_px: u32,
    pub is_touch_or_coarse_pointer: bool,
    pub cpu_core_count: u32,
    pub device_memory_gib: f32,
    pub network_save_data_requested: bool,
    pub network_effective_type: EffectiveConnectionType,
    pub prefers_reduced_motion: bool,
}

impl Default for ClassifierSignals {
    /// Signals for a host that reports nothing at all
    fn default() -> Self {
        SignalProbe::default().resolve()
    }
}

/// Best-effort report of environment signals; any field may be unavailable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalProbe {
    pub viewport_width_px: Option<u32>,
    pub is_touch_or_coarse_pointer: Option<bool>,
    pub cpu_core_count: Option<u32>,
    pub device_memory_gib: Option<f32>,
    pub network_save_data_requested: Option<bool>,
    pub network_effective_type: Option<EffectiveConnectionType>,
    pub prefers_reduced_motion: Option<bool>,
    /// Raw user-agent string, used as an extra mobile hint
    pub user_agent: Option<String>,
}

impl SignalProbe {
    /// Substitute defaults for every signal the host could not supply
    ///
    /// A reported core count or memory of zero is treated as unreported,
    /// as is a non-finite or negative memory figure.
    pub fn resolve(&self) -> ClassifierSignals {
        let cpu_core_count = self
            .cpu_core_count
            .filter(|cores| *cores > 0)
            .unwrap_or(DEFAULT_CPU_CORES);

        let device_memory_gib = self
            .device_memory_gib
            .filter(|gib| gib.is_finite() && *gib > 0.0)
            .unwrap_or(DEFAULT_DEVICE_MEMORY_GIB);

        let mobile_agent = self
            .user_agent
            .as_deref()
            .map(is_mobile_user_agent)
            .unwrap_or(false);

        ClassifierSignals {
            viewport_width_px: self.viewport_width_px.unwrap_or(DEFAULT_VIEWPORT_WIDTH_PX),
            is_touch_or_coarse_pointer: self.is_touch_or_coarse_pointer.unwrap_or(false)
                || mobile_agent,
            cpu_core_count,
            device_memory_gib,
            network_save_data_requested: self.network_save_data_requested.unwrap_or(false),
            network_effective_type: self.network_effective_type.unwrap_or_default(),
            prefers_reduced_motion: self.prefers_reduced_motion.unwrap_or(false),
        }
    }
}

/// Returns true when the user agent names a phone or tablet platform
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let lowered = user_agent.to_ascii_lowercase();
    MOBILE_USER_AGENT_TOKENS
        .iter()
        .any(|token| lowered.contains(token))
}
