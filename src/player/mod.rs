//! Hardware player access
//!
//! - Device: capability trait for the native player object
//! - Handle: state-guarded wrapper owned by the lifecycle controller
//! - Sim: in-process device for running without TV hardware

pub mod device;
pub mod handle;
pub mod sim;

pub use device::{DeviceError, PlayerDevice, PlayerListener, PrepareCallback};
pub use handle::{Guarded, PlayerError, PlayerHandle, Teardown};
pub use sim::{SimulatedPlayer, SimulatedPlayerRemote};
