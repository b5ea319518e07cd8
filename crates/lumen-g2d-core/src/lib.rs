//! Command-buffer lifecycle and double-buffered display synchronization
//! for the lumen-g2d 2D accelerator.
//!
//! The crate is platform-agnostic: the accelerator driver, the display
//! transport, and the wake signal are `lumen-g2d-hal` traits. The render
//! producer side (`Engine`, `FlushProducer`) is owned by the task that
//! drives UI composition; the consumer side (`RefreshTask`) runs as a
//! dedicated task and owns the display transport. The only state shared
//! between the two is the `RefreshChannel`.

#![no_std]

pub mod cmd;
pub mod engine;
pub mod frame;

pub use cmd::{ArenaStats, ALLOC_FLOOR_WORDS};
pub use engine::{Engine, EngineError, Recorder};
pub use frame::channel::RefreshChannel;
pub use frame::producer::{FlushError, FlushProducer};
pub use frame::task::{RefreshConfig, RefreshOutcome, RefreshTask};
pub use frame::{FrameBuffer, FrameError, FramePair, PixelFormat, Rect, RefreshRequest, SyncPolicy};
