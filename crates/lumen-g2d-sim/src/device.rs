//! Simulated accelerator: register-stream interpreter with a
//! fixed-depth submission ring and asynchronous completion.
//!
//! Submissions are parsed into operations at submit time (the model's
//! stand-in for the hardware fetching the command buffer) and executed
//! against simulated device memory by a worker thread, which advances
//! the completed-sequence counter in submission order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use lumen_g2d_core::engine::registers;
use lumen_g2d_hal::Accelerator;

/// Simulated device memory size.
pub const DEVICE_MEM_BYTES: usize = 1 << 20;
/// Hardware submission ring depth.
pub const RING_DEPTH: usize = 8;
/// Conventional frame buffer addresses in device memory.
pub const FB_A_ADDR: u32 = 0x0000_0000;
pub const FB_B_ADDR: u32 = 0x0008_0000;

/// Handle to device memory, shared with the panel transport.
pub type SharedMem = MemProxy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimDeviceError {
    /// Submission while the engine is powered down.
    NotPowered,
    /// Power-off requested while work is still in flight.
    PowerOffWhileBusy,
    /// Submission past the ring depth (the backpressure guard failed).
    RingOverflow,
    /// Injected power-primitive failure.
    PowerFault,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Copy {
        src: u32,
        src_stride: u32,
        dst: u32,
        dst_stride: u32,
        w: u16,
        h: u16,
        bpp: u32,
    },
    Fill {
        dst: u32,
        dst_stride: u32,
        w: u16,
        h: u16,
        color: u32,
        bpp: u32,
    },
}

/// Operand registers latched between CTRL writes.
#[derive(Default, Clone, Copy)]
struct RegFile {
    src_addr: u32,
    src_stride: u32,
    dst_addr: u32,
    dst_stride: u32,
    dims: u32,
    fill_color: u32,
    pix_fmt: u32,
}

impl RegFile {
    fn bpp(&self) -> u32 {
        match self.pix_fmt {
            registers::FMT_RGB565 => 2,
            registers::FMT_RGB888 => 3,
            registers::FMT_ARGB8888 => 4,
            other => {
                log::warn!("unknown PIX_FMT code {}, assuming 4 bytes", other);
                4
            }
        }
    }
}

struct Shared {
    mem: Mutex<Vec<u8>>,
    queue: Mutex<VecDeque<(u64, Vec<Op>)>>,
    queue_cv: Condvar,
    completed: Mutex<u64>,
    done_cv: Condvar,
    last_submitted: AtomicU64,
    running: AtomicBool,
}

pub struct SimAccelerator {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    powered: bool,
    fail_power: bool,
    power_on_count: u32,
    power_off_count: u32,
}

impl SimAccelerator {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            mem: Mutex::new(vec![0u8; DEVICE_MEM_BYTES]),
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            completed: Mutex::new(0),
            done_cv: Condvar::new(),
            last_submitted: AtomicU64::new(0),
            running: AtomicBool::new(true),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || worker_main(worker_shared));
        Self {
            shared,
            worker: Some(worker),
            powered: false,
            fail_power: false,
            power_on_count: 0,
            power_off_count: 0,
        }
    }

    /// Handle to device memory, to share with a panel transport.
    pub fn shared_mem(&self) -> SharedMem {
        MemProxy(Arc::clone(&self.shared))
    }

    /// Make both power primitives fail, for fault-path tests.
    pub fn set_fail_power(&mut self, fail: bool) {
        self.fail_power = fail;
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// (enable, disable) request counts seen by the driver.
    pub fn power_cycles(&self) -> (u32, u32) {
        (self.power_on_count, self.power_off_count)
    }
}

impl Default for SimAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_main(shared: Arc<Shared>) {
    loop {
        let (seq, ops) = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if !shared.running.load(Ordering::Acquire) {
                    return;
                }
                if let Some(job) = queue.pop_front() {
                    break job;
                }
                queue = shared.queue_cv.wait(queue).unwrap();
            }
        };
        {
            let mut mem = shared.mem.lock().unwrap();
            for op in &ops {
                execute(&mut mem, op);
            }
        }
        let mut completed = shared.completed.lock().unwrap();
        *completed = seq;
        shared.done_cv.notify_all();
    }
}

fn execute(mem: &mut [u8], op: &Op) {
    match *op {
        Op::Copy {
            src,
            src_stride,
            dst,
            dst_stride,
            w,
            h,
            bpp,
        } => {
            let row_bytes = w as usize * bpp as usize;
            for row in 0..h as usize {
                let s = src as usize + row * src_stride as usize;
                let d = dst as usize + row * dst_stride as usize;
                if s + row_bytes > mem.len() || d + row_bytes > mem.len() {
                    log::warn!("copy out of device memory bounds, dropped");
                    return;
                }
                let line = mem[s..s + row_bytes].to_vec();
                mem[d..d + row_bytes].copy_from_slice(&line);
            }
        }
        Op::Fill {
            dst,
            dst_stride,
            w,
            h,
            color,
            bpp,
        } => {
            let px = color.to_le_bytes();
            let row_bytes = w as usize * bpp as usize;
            for row in 0..h as usize {
                let d = dst as usize + row * dst_stride as usize;
                if d + row_bytes > mem.len() {
                    log::warn!("fill out of device memory bounds, dropped");
                    return;
                }
                for col in 0..w as usize {
                    let at = d + col * bpp as usize;
                    mem[at..at + bpp as usize].copy_from_slice(&px[..bpp as usize]);
                }
            }
        }
    }
}

/// Parse a recorded (register, value) stream into operations.
fn parse(words: &[u32]) -> Vec<Op> {
    let mut regs = RegFile::default();
    let mut ops = Vec::new();
    for pair in words.chunks_exact(2) {
        let (reg, value) = (pair[0], pair[1]);
        match reg {
            registers::SRC_ADDR => regs.src_addr = value,
            registers::SRC_STRIDE => regs.src_stride = value,
            registers::DST_ADDR => regs.dst_addr = value,
            registers::DST_STRIDE => regs.dst_stride = value,
            registers::DIMS => regs.dims = value,
            registers::FILL_COLOR => regs.fill_color = value,
            registers::PIX_FMT => regs.pix_fmt = value,
            registers::CTRL => {
                let w = registers::dims_width(regs.dims);
                let h = registers::dims_height(regs.dims);
                match value {
                    registers::CTRL_OP_COPY => ops.push(Op::Copy {
                        src: regs.src_addr,
                        src_stride: regs.src_stride,
                        dst: regs.dst_addr,
                        dst_stride: regs.dst_stride,
                        w,
                        h,
                        bpp: regs.bpp(),
                    }),
                    registers::CTRL_OP_FILL => ops.push(Op::Fill {
                        dst: regs.dst_addr,
                        dst_stride: regs.dst_stride,
                        w,
                        h,
                        color: regs.fill_color,
                        bpp: regs.bpp(),
                    }),
                    other => log::warn!("unknown CTRL op {}, ignored", other),
                }
            }
            other => log::warn!("write to unknown register 0x{:02X}, ignored", other),
        }
    }
    ops
}

impl Accelerator for SimAccelerator {
    type Error = SimDeviceError;

    fn power_on(&mut self) -> Result<(), SimDeviceError> {
        if self.fail_power {
            return Err(SimDeviceError::PowerFault);
        }
        self.powered = true;
        self.power_on_count += 1;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), SimDeviceError> {
        if self.fail_power {
            return Err(SimDeviceError::PowerFault);
        }
        if self.is_busy() {
            return Err(SimDeviceError::PowerOffWhileBusy);
        }
        self.powered = false;
        self.power_off_count += 1;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        let completed = *self.shared.completed.lock().unwrap();
        completed < self.shared.last_submitted.load(Ordering::Acquire)
    }

    fn submit(&mut self, words: &[u32]) -> Result<u64, SimDeviceError> {
        if !self.powered {
            return Err(SimDeviceError::NotPowered);
        }
        let ops = parse(words);
        let mut queue = self.shared.queue.lock().unwrap();
        if queue.len() >= RING_DEPTH {
            return Err(SimDeviceError::RingOverflow);
        }
        let seq = self.shared.last_submitted.fetch_add(1, Ordering::AcqRel) + 1;
        queue.push_back((seq, ops));
        self.shared.queue_cv.notify_one();
        Ok(seq)
    }

    fn completed_seq(&self) -> u64 {
        *self.shared.completed.lock().unwrap()
    }

    fn is_ring_full(&self) -> bool {
        self.shared.queue.lock().unwrap().len() >= RING_DEPTH
    }

    fn wait_seq(&mut self, seq: u64) {
        let mut completed = self.shared.completed.lock().unwrap();
        while *completed < seq {
            completed = self.shared.done_cv.wait(completed).unwrap();
        }
    }
}

impl Drop for SimAccelerator {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.queue_cv.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Read-only style proxy so the panel can reach device memory without
/// owning the rest of the device state.
#[derive(Clone)]
pub struct MemProxy(Arc<Shared>);

impl MemProxy {
    pub fn read(&self, addr: u32, len: u32, out: &mut Vec<u8>) -> bool {
        let mem = self.0.mem.lock().unwrap();
        let start = addr as usize;
        let end = start + len as usize;
        if end > mem.len() {
            return false;
        }
        out.clear();
        out.extend_from_slice(&mem[start..end]);
        true
    }

    pub fn snapshot(&self, addr: u32, len: u32) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        if self.read(addr, len, &mut out) {
            Some(out)
        } else {
            None
        }
    }
}
