//! Host demo for the lumen-g2d pipeline.
//!
//! Drives double-buffered frames through the full
//! allocate/submit/power/ring pipeline against the software device
//! model: paint the active buffer, flush (sync copy + display post),
//! fence with the gpu-wait callback, then swap buffers — the same
//! sequence a UI library integration performs.

use std::sync::atomic::{AtomicU32, Ordering};

use lumen_g2d_core::engine::registers;
use lumen_g2d_core::{
    Engine, EngineError, FlushError, FlushProducer, FrameBuffer, FramePair, PixelFormat, Rect,
    RefreshChannel, RefreshConfig, RefreshTask, SyncPolicy,
};
use lumen_g2d_sim::{CondvarSignal, SimAccelerator, SimDeviceError, SimPanel, FB_A_ADDR, FB_B_ADDR};

const RESX: u16 = 320;
const RESY: u16 = 240;
const FRAMES: u32 = 8;

const POOL_WORDS: usize = 4096;
const POOL_SLOTS: usize = 8;

static CHANNEL: RefreshChannel = RefreshChannel::new();
static SIGNAL: CondvarSignal = CondvarSignal::new();
static FRAMES_DONE: AtomicU32 = AtomicU32::new(0);

fn main() {
    env_logger::init();
    log::info!("lumen-g2d-sim: host demo starting");

    let accel = SimAccelerator::new();
    let panel = SimPanel::new(accel.shared_mem(), true);

    // Display refresh task, detached for the life of the process.
    std::thread::spawn(move || {
        let cfg = RefreshConfig {
            stat_interval: 4,
            ..RefreshConfig::default()
        };
        let mut task = RefreshTask::new(panel, &CHANNEL, &SIGNAL, cfg, || {
            FRAMES_DONE.fetch_add(1, Ordering::Release);
        });
        task.run();
    });

    let engine: Engine<_, POOL_WORDS, POOL_SLOTS> = Engine::new(accel);
    let stride = RESX as u32 * PixelFormat::Rgb565.bytes_per_px();
    let fb = |addr, slot| FrameBuffer {
        addr,
        width: RESX,
        height: RESY,
        stride,
        format: PixelFormat::Rgb565,
        slot,
    };
    let pair = FramePair::new(fb(FB_A_ADDR, 0), fb(FB_B_ADDR, 1)).expect("frame pair");
    let mut producer =
        FlushProducer::new(engine, pair, SyncPolicy::CopyOnFlush, &CHANNEL, &SIGNAL);

    let mut active = FB_A_ADDR;
    for frame in 0..FRAMES {
        // Stand-in for UI composition: one solid fill per frame.
        let color = 0x1F << ((frame % 3) * 5);
        if let Err(e) = paint(&mut producer, active, color) {
            match e {
                EngineError::Exhausted => {
                    log::warn!("frame {}: arena exhausted, frame skipped", frame);
                    continue;
                }
                EngineError::Fault(e) => halt(e),
            }
        }

        match producer.flush(Rect::full(RESX, RESY), active) {
            Ok(()) => {}
            Err(FlushError::Engine(EngineError::Fault(e))) => halt(e),
            Err(e) => log::warn!("frame {}: flush degraded: {:?}", frame, e),
        }

        // The UI library's gpu-wait: fence draws and the sync copy
        // before composing into the sibling buffer.
        producer.gpu_wait();

        // Wait for the display task to hand the buffer back.
        while FRAMES_DONE.load(Ordering::Acquire) <= frame {
            std::thread::yield_now();
        }

        active = if active == FB_A_ADDR { FB_B_ADDR } else { FB_A_ADDR };
    }

    let stats = producer.engine().stats();
    log::info!(
        "demo done: carved={}, released={}, peak={} words",
        stats.carved,
        stats.released,
        stats.peak_words
    );

    match producer.deinit() {
        Ok(_driver) => log::info!("engine drained and powered down"),
        Err(EngineError::Fault(e)) => halt(e),
        Err(e) => log::warn!("teardown: {:?}", e),
    }
}

fn paint<const W: usize, const S: usize>(
    producer: &mut FlushProducer<'_, SimAccelerator, CondvarSignal, W, S>,
    addr: u32,
    color: u32,
) -> Result<(), EngineError<SimDeviceError>> {
    let stride = RESX as u32 * PixelFormat::Rgb565.bytes_per_px();
    let mut rec = producer.engine().begin(16, true)?;
    rec.push(registers::DST_ADDR, addr)?;
    rec.push(registers::DST_STRIDE, stride)?;
    rec.push(registers::DIMS, registers::pack_dims(RESX, RESY))?;
    rec.push(registers::PIX_FMT, PixelFormat::Rgb565.code())?;
    rec.push(registers::FILL_COLOR, color)?;
    rec.push(registers::CTRL, registers::CTRL_OP_FILL)?;
    rec.submit()?;
    Ok(())
}

/// A failed power primitive leaves the engine state unknown; stop the
/// subsystem instead of running on.
fn halt(e: SimDeviceError) -> ! {
    log::error!("unrecoverable accelerator fault: {:?}", e);
    std::process::exit(1);
}
