pub mod opcode;
pub mod memory;
pub mod thread;
pub mod effect;
pub mod config;
pub mod executor;
pub mod simulator;
pub mod metrics;
pub mod view;

pub use config::{Config, ConfigError};
pub use simulator::{Simulator, SimulatorError};
