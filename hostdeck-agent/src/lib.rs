//! Hostdeck Agent - host telemetry and container control
//!
//! Everything the dashboard API needs to answer a request:
//! - Counter state and rate computation across requests
//! - Host snapshot (CPU, memory, disk, temperature, network)
//! - Top processes by CPU usage
//! - Container listing and lifecycle actions via the runtime CLI
//! - Uptime and bandwidth probes
//!
//! Every reading is taken fresh from the kernel-exposed filesystem or from an
//! external command; the only state that outlives a call is the [`CounterStore`].

pub mod config;
pub mod containers;
pub mod counters;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod processes;
pub mod rate;
pub mod speedtest;

pub use config::{KernelPaths, RuntimeConfig, SpeedtestConfig, TelemetryConfig};
pub use containers::{
    Container, ContainerAction, ContainerActionRequest, ContainerController, ContainerId,
    RecreateOutcome,
};
pub use counters::{CounterSample, CounterStore};
pub use error::{ContainerError, ExecError, ProbeError, SpeedtestError, ValidationError};
pub use execution::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use metrics::{HostSampler, HostSnapshot, NetworkRates, Uptime, UsageStats};
pub use processes::{ProcessRanker, ProcessSample};
pub use rate::{RateComputer, RateResult, RateStatus};
pub use speedtest::{SpeedtestProbe, SpeedtestResult};
