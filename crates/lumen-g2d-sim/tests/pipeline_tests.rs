//! End-to-end pipeline tests against the software device model:
//! real pixels move through fill, flush copy, and panel transfer.

use lumen_g2d_core::engine::registers;
use lumen_g2d_core::{
    Engine, EngineError, FlushProducer, FrameBuffer, FramePair, PixelFormat, Rect, RefreshChannel,
    RefreshConfig, RefreshOutcome, RefreshTask, SyncPolicy,
};
use lumen_g2d_sim::{CondvarSignal, SimAccelerator, SimDeviceError, SimPanel, FB_A_ADDR, FB_B_ADDR};

const RESX: u16 = 32;
const RESY: u16 = 16;
const STRIDE: u32 = RESX as u32 * 2;
const FRAME_BYTES: u32 = STRIDE * RESY as u32;

type SimEngine = Engine<SimAccelerator, 1024, 8>;

fn frame_pair() -> FramePair {
    let fb = |addr, slot| FrameBuffer {
        addr,
        width: RESX,
        height: RESY,
        stride: STRIDE,
        format: PixelFormat::Rgb565,
        slot,
    };
    FramePair::new(fb(FB_A_ADDR, 0), fb(FB_B_ADDR, 1)).expect("pair")
}

fn fill(engine: &mut SimEngine, addr: u32, color: u32) {
    let mut rec = engine.begin(16, false).expect("begin fill");
    rec.push(registers::DST_ADDR, addr).unwrap();
    rec.push(registers::DST_STRIDE, STRIDE).unwrap();
    rec.push(registers::DIMS, registers::pack_dims(RESX, RESY)).unwrap();
    rec.push(registers::PIX_FMT, PixelFormat::Rgb565.code()).unwrap();
    rec.push(registers::FILL_COLOR, color).unwrap();
    rec.push(registers::CTRL, registers::CTRL_OP_FILL).unwrap();
    rec.submit().expect("submit fill");
}

#[test]
fn flush_copy_synchronizes_the_sibling_buffer() {
    let accel = SimAccelerator::new();
    let mem = accel.shared_mem();
    let chan = RefreshChannel::new();
    let signal = CondvarSignal::new();

    let mut producer = FlushProducer::new(
        SimEngine::new(accel),
        frame_pair(),
        SyncPolicy::CopyOnFlush,
        &chan,
        &signal,
    );

    fill(producer.engine(), FB_A_ADDR, 0x0000_F800);
    producer.flush(Rect::full(RESX, RESY), FB_A_ADDR).expect("flush");
    // The gpu-wait fence guarantees the copy has landed.
    producer.gpu_wait();

    let a = mem.snapshot(FB_A_ADDR, FRAME_BYTES).expect("fb a");
    let b = mem.snapshot(FB_B_ADDR, FRAME_BYTES).expect("fb b");
    assert_eq!(a, b);
    assert_eq!(&a[..2], &[0x00, 0xF8]);

    let stats = producer.engine().stats();
    assert_eq!(stats.carved, stats.released + stats.live as u64);
    producer.deinit().expect("teardown");
}

#[test]
fn transferred_frame_reaches_the_panel() {
    let accel = SimAccelerator::new();
    let panel = SimPanel::new(accel.shared_mem(), true);
    let chan = RefreshChannel::new();
    let signal = CondvarSignal::new();

    let mut producer = FlushProducer::new(
        SimEngine::new(accel),
        frame_pair(),
        SyncPolicy::CopyOnFlush,
        &chan,
        &signal,
    );
    let mut task = RefreshTask::new(panel, &chan, &signal, RefreshConfig::default(), || {});

    fill(producer.engine(), FB_A_ADDR, 0x0000_07E0);
    producer.flush(Rect::full(RESX, RESY), FB_A_ADDR).expect("flush");
    producer.gpu_wait();

    assert_eq!(task.service(), Some(RefreshOutcome::Transferred));

    // Panel image matches the filled frame, byte for byte.
    let expected: Vec<u8> = (0..FRAME_BYTES / 2).flat_map(|_| [0xE0, 0x07]).collect();
    assert_eq!(task.display().panel(), expected.as_slice());
    assert_eq!(task.display().transfers(), 1);
}

#[test]
fn alternating_frames_drive_both_buffers_to_the_panel() {
    let accel = SimAccelerator::new();
    let mem = accel.shared_mem();
    let panel = SimPanel::new(accel.shared_mem(), true);
    let chan = RefreshChannel::new();
    let signal = CondvarSignal::new();

    let mut producer = FlushProducer::new(
        SimEngine::new(accel),
        frame_pair(),
        SyncPolicy::CopyOnFlush,
        &chan,
        &signal,
    );
    let mut task = RefreshTask::new(panel, &chan, &signal, RefreshConfig::default(), || {});

    let mut active = FB_A_ADDR;
    for frame in 0..4u32 {
        fill(producer.engine(), active, 0x20 + frame);
        producer.flush(Rect::full(RESX, RESY), active).expect("flush");
        producer.gpu_wait();
        assert_eq!(task.service(), Some(RefreshOutcome::Transferred));

        // After the fence, both buffers hold the new frame.
        let a = mem.snapshot(FB_A_ADDR, FRAME_BYTES).expect("fb a");
        let b = mem.snapshot(FB_B_ADDR, FRAME_BYTES).expect("fb b");
        assert_eq!(a, b, "frame {}: pair out of sync", frame);

        active = if active == FB_A_ADDR { FB_B_ADDR } else { FB_A_ADDR };
    }

    producer.deinit().expect("teardown");
}

#[test]
fn panel_timeout_keeps_the_pipeline_alive() {
    let accel = SimAccelerator::new();
    let mut panel = SimPanel::new(accel.shared_mem(), true);
    panel.set_force_timeout(true);
    let chan = RefreshChannel::new();
    let signal = CondvarSignal::new();

    let mut producer = FlushProducer::new(
        SimEngine::new(accel),
        frame_pair(),
        SyncPolicy::CopyOnFlush,
        &chan,
        &signal,
    );

    let released = std::cell::Cell::new(0u32);
    let mut task = RefreshTask::new(panel, &chan, &signal, RefreshConfig::default(), || {
        released.set(released.get() + 1);
    });

    fill(producer.engine(), FB_A_ADDR, 0xFFFF);
    producer.flush(Rect::full(RESX, RESY), FB_A_ADDR).expect("flush");
    producer.gpu_wait();

    assert_eq!(task.service(), Some(RefreshOutcome::TimedOut));
    // The frame buffer still came back to the producer.
    assert_eq!(released.get(), 1);
}

#[test]
fn power_fault_is_surfaced_as_fatal() {
    let mut accel = SimAccelerator::new();
    accel.set_fail_power(true);
    let mut engine = SimEngine::new(accel);

    let err = engine.begin(16, false).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fault(SimDeviceError::PowerFault)
    ));
}
