// Classifier - rule-based performance tier selection
//
// Derives which visual affordances are safe to enable from a snapshot of
// environment signals. The derivation is a pure function: the same signals
// always produce the same output, so callers may re-evaluate freely.
//
// Rules:
// 1. low-end hardware   = cores < 4 OR memory < 4 GiB
// 2. constrained network = save-data OR effective type in {slow-2g, 2g}
// 3. small viewport/touch = width <= 768 px OR coarse pointer
// 4. LOW if any of 1-3 or reduced motion; HIGH if cores >= 8 AND memory >= 8;
//    otherwise MEDIUM

use serde::{Deserialize, Serialize};

use super::signals::ClassifierSignals;

/// Widest viewport still treated as a mobile layout
pub const MOBILE_BREAKPOINT_PX: u32 = 768;

/// Minimum cores / GiB for anything above LOW
const LOW_END_CPU_CORES: u32 = 4;
const LOW_END_MEMORY_GIB: f32 = 4.0;

/// Minimum cores / GiB for HIGH
const HIGH_END_CPU_CORES: u32 = 8;
const HIGH_END_MEMORY_GIB: f32 = 8.0;

/// Discrete performance classification of the runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PerformanceTier {
    High,
    Medium,
    Low,
}

impl PerformanceTier {
    /// Decorative element budget for this tier
    pub fn particle_budget(self) -> u32 {
        match self {
            Self::High => 20,
            Self::Medium => 10,
            Self::Low => 0,
        }
    }

    /// Base duration for UI transitions in milliseconds
    pub fn animation_duration_ms(self) -> u32 {
        match self {
            Self::High => 300,
            Self::Medium => 200,
            Self::Low => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Coarse two-state view of the output: full motion or reduced motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionProfile {
    Full,
    Reduced,
}

/// Immutable decision bundle derived from a signal snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub tier: PerformanceTier,
    /// 3D scenes and ambient particle fields
    pub allow_heavy_effects: bool,
    pub allow_blur_and_shadow: bool,
    pub allow_animation: bool,
    /// Hint for how many decorative elements to render (0 when animation is off)
    pub particle_budget: u32,
    /// Smooth (inertial) scrolling, disabled on small or touch screens
    pub allow_smooth_scroll: bool,
    pub allow_particles: bool,
    pub animation_duration_ms: u32,
}

impl ClassifierOutput {
    pub fn motion_profile(&self) -> MotionProfile {
        if self.allow_animation {
            MotionProfile::Full
        } else {
            MotionProfile::Reduced
        }
    }
}

/// Hardware below the supported baseline
pub fn is_low_end_hardware(signals: &ClassifierSignals) -> bool {
    signals.cpu_core_count < LOW_END_CPU_CORES || signals.device_memory_gib < LOW_END_MEMORY_GIB
}

/// Network where the user asked to save data or the link is 2G-class
pub fn is_constrained_network(signals: &ClassifierSignals) -> bool {
    signals.network_save_data_requested || signals.network_effective_type.is_constrained()
}

/// Mobile-width viewport or a coarse (touch) primary pointer
pub fn is_small_viewport_or_touch(signals: &ClassifierSignals) -> bool {
    signals.viewport_width_px <= MOBILE_BREAKPOINT_PX || signals.is_touch_or_coarse_pointer
}

/// Derive the tier from a signal snapshot
pub fn classify_tier(signals: &ClassifierSignals) -> PerformanceTier {
    if is_small_viewport_or_touch(signals)
        || is_low_end_hardware(signals)
        || is_constrained_network(signals)
        || signals.prefers_reduced_motion
    {
        PerformanceTier::Low
    } else if signals.cpu_core_count >= HIGH_END_CPU_CORES
        && signals.device_memory_gib >= HIGH_END_MEMORY_GIB
    {
        PerformanceTier::High
    } else {
        PerformanceTier::Medium
    }
}

/// Evaluate a signal snapshot into a full decision bundle
///
/// Total and pure: never fails, holds no state between calls.
pub fn evaluate(signals: &ClassifierSignals) -> ClassifierOutput {
    let tier = classify_tier(signals);
    let allow_animation = !signals.prefers_reduced_motion && tier != PerformanceTier::Low;

    ClassifierOutput {
        tier,
        allow_heavy_effects: tier == PerformanceTier::High,
        allow_blur_and_shadow: tier != PerformanceTier::Low,
        allow_animation,
        particle_budget: tier.particle_budget(),
        allow_smooth_scroll: !is_small_viewport_or_touch(signals),
        allow_particles: tier == PerformanceTier::High,
        animation_duration_ms: tier.animation_duration_ms(),
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
