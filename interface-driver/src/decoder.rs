//! Instruction Decoder. Classifies the instruction sitting at the faulting program
//! counter: direction, operand width, total encoded length, the `reg` field of its
//! ModR/M byte, and — for immediate-form stores — the immediate value to ship to the
//! model.
//!
//! Only the register-memory move family the reference driver interface targets is
//! recognized (see the opcode table below). Everything else decodes as an
//! "unrecognized" width-4 load with a heuristic fallback length — this keeps the driver
//! making forward progress at the cost of a likely-wrong value, rather than hanging on
//! a re-fault.

/// Safe upper bound on x86-64 instruction length; also the clamp ceiling for a decoded
/// length.
const MAX_INSTRUCTION_LEN: u8 = 15;

/// Fallback length used when the opcode isn't recognized but the instruction pointer is
/// valid. Matches the reference implementation's heuristic.
const FALLBACK_LEN_UNKNOWN_OPCODE: u8 = 6;

/// Fallback length used when no instruction pointer is available at all.
const FALLBACK_LEN_NO_POINTER: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Load,
    Store,
}

/// The outcome of decoding one instruction at the faulting program counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedAccess {
    pub direction: Direction,
    /// Operand width in bytes: 1, 2, or 4.
    pub width: u8,
    /// Total encoded instruction length, used to advance the program counter.
    pub length: u8,
    /// The `reg` field of the ModR/M byte, if one was decoded. The reference decoder
    /// never uses this for register selection; it is exposed so a caller can do
    /// better.
    pub modrm_reg: Option<u8>,
    /// Immediate value for immediate-form stores (`0xC6`/`0xC7`), zero-extended to 32
    /// bits. `None` for register-source stores and all loads.
    pub immediate: Option<u32>,
    /// Whether the opcode was one of the recognized register-memory move forms.
    pub recognized: bool,
}

impl DecodedAccess {
    fn fallback(length: u8) -> Self {
        DecodedAccess {
            direction: Direction::Load,
            width: 4,
            length,
            modrm_reg: None,
            immediate: None,
            recognized: false,
        }
    }
}

fn is_skippable_prefix(byte: u8) -> bool {
    matches!(byte, 0x67 | 0xF2 | 0xF3) || (0x40..=0x4F).contains(&byte)
}

/// Decode the instruction at `ptr`.
///
/// # Safety
/// `ptr` must point at up to [`MAX_INSTRUCTION_LEN`] readable bytes, or be null (in which
/// case the safe fallback is returned without dereferencing anything).
pub unsafe fn decode(ptr: *const u8) -> DecodedAccess {
    if ptr.is_null() {
        return DecodedAccess::fallback(FALLBACK_LEN_NO_POINTER);
    }

    let base = ptr as usize;
    let mut cursor = ptr;
    let mut operand_size_prefix = false;

    loop {
        let byte = *cursor;
        if byte == 0x66 {
            operand_size_prefix = true;
            cursor = cursor.add(1);
        } else if is_skippable_prefix(byte) {
            cursor = cursor.add(1);
        } else {
            break;
        }
    }

    let opcode = *cursor;
    cursor = cursor.add(1);

    enum Immediate {
        None,
        Byte,
        DwordOrWord,
    }

    let (direction, mut width, imm_kind) = match opcode {
        0x89 => (Direction::Store, 4, Immediate::None),
        0x8B => (Direction::Load, 4, Immediate::None),
        0x88 => (Direction::Store, 1, Immediate::None),
        0x8A => (Direction::Load, 1, Immediate::None),
        0xC7 => (Direction::Store, 4, Immediate::DwordOrWord),
        0xC6 => (Direction::Store, 1, Immediate::Byte),
        _ => return DecodedAccess::fallback(FALLBACK_LEN_UNKNOWN_OPCODE),
    };

    if operand_size_prefix {
        width = 2;
    }

    let modrm = *cursor;
    let modrm_reg = (modrm >> 3) & 0x7;
    let mode = (modrm >> 6) & 0x3;
    let rm = modrm & 0x7;
    cursor = cursor.add(1);

    if mode != 0b11 && rm == 0b100 {
        cursor = cursor.add(1); // SIB byte
    }

    match mode {
        0b01 => cursor = cursor.add(1),                 // 8-bit displacement
        0b10 => cursor = cursor.add(4),                 // 32-bit displacement
        0b00 if rm == 0b101 => cursor = cursor.add(4),  // RIP-relative / disp32
        _ => {}
    }

    let immediate = match imm_kind {
        Immediate::None => None,
        Immediate::Byte => {
            let value = *cursor as u32;
            cursor = cursor.add(1);
            Some(value)
        }
        Immediate::DwordOrWord => {
            let len = if operand_size_prefix { 2 } else { 4 };
            let value = read_zero_extended(cursor, len);
            cursor = cursor.add(len);
            Some(value)
        }
    };

    let raw_len = (cursor as usize).saturating_sub(base);
    let length = raw_len.clamp(1, MAX_INSTRUCTION_LEN as usize) as u8;

    DecodedAccess {
        direction,
        width,
        length,
        modrm_reg: Some(modrm_reg),
        immediate,
        recognized: true,
    }
}

unsafe fn read_zero_extended(ptr: *const u8, len: usize) -> u32 {
    let mut value: u32 = 0;
    for i in 0..len {
        value |= (*ptr.add(i) as u32) << (8 * i);
    }
    value
}
