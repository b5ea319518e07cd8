//! Software model of the lumen-g2d accelerator and display panel.
//!
//! Implements the `lumen-g2d-hal` traits against a simulated device
//! memory so the whole lifecycle and display pipeline can run, and be
//! observed, on a host machine: a register-stream interpreter with a
//! fixed-depth submission ring and a worker-thread completion engine, a
//! panel transport that copies transferred pixels out of device memory,
//! and a condvar-backed wake signal.

pub mod device;
pub mod display;
pub mod signal;

pub use device::{SimAccelerator, SimDeviceError, SharedMem, DEVICE_MEM_BYTES, FB_A_ADDR, FB_B_ADDR, RING_DEPTH};
pub use display::{SimPanel, SimPanelError};
pub use signal::CondvarSignal;
