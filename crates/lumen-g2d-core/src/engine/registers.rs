//! Accelerator command register offsets and bit-field constants.
//!
//! A recorded command buffer is a flat sequence of (offset, value)
//! word pairs. Writes latch operand registers; a `CTRL` write with an
//! op code starts the operation using the latched operands.

/// Source surface base address in device memory.
pub const SRC_ADDR: u32 = 0x00;
/// Source row stride in bytes.
pub const SRC_STRIDE: u32 = 0x04;
/// Destination surface base address in device memory.
pub const DST_ADDR: u32 = 0x08;
/// Destination row stride in bytes.
pub const DST_STRIDE: u32 = 0x0C;
/// Operation extent: width in [31:16], height in [15:0], both in pixels.
pub const DIMS: u32 = 0x10;
/// Fill color, packed per the surface pixel format in the low bits.
pub const FILL_COLOR: u32 = 0x14;
/// Pixel format code for the operation (see `FMT_*`).
pub const PIX_FMT: u32 = 0x18;
/// Control: op code in [3:0]. Writing a nonzero op starts the operation.
pub const CTRL: u32 = 0x1C;

/// CTRL op: rectangular copy SRC -> DST.
pub const CTRL_OP_COPY: u32 = 0x1;
/// CTRL op: solid fill of DST with FILL_COLOR.
pub const CTRL_OP_FILL: u32 = 0x2;

/// PIX_FMT code: 16-bit RGB565.
pub const FMT_RGB565: u32 = 0x0;
/// PIX_FMT code: 24-bit RGB888.
pub const FMT_RGB888: u32 = 0x1;
/// PIX_FMT code: 32-bit ARGB8888.
pub const FMT_ARGB8888: u32 = 0x2;

/// Pack an operation extent for the `DIMS` register.
pub const fn pack_dims(w: u16, h: u16) -> u32 {
    ((w as u32) << 16) | (h as u32)
}

/// Width half of a packed `DIMS` value.
pub const fn dims_width(dims: u32) -> u16 {
    (dims >> 16) as u16
}

/// Height half of a packed `DIMS` value.
pub const fn dims_height(dims: u32) -> u16 {
    (dims & 0xFFFF) as u16
}
