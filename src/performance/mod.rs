// Performance module - adaptive rendering tier selection
//
// Visual components consult this module to decide between full-motion and
// reduced-motion variants. The classifier itself is a pure function over a
// signal snapshot; the monitor republishes its output when the hosting
// environment reports a relevant change.

pub mod classifier;
pub mod environment;
pub mod monitor;
pub mod signals;

pub use classifier::{evaluate, ClassifierOutput, MotionProfile, PerformanceTier};
pub use environment::{
    Environment, EnvironmentChange, EnvironmentListener, ListenerId, ManualEnvironment,
    StaticEnvironment,
};
pub use monitor::{PerformanceMonitor, Subscription};
pub use signals::{ClassifierSignals, EffectiveConnectionType, SignalProbe};
