/// The four-operation instruction set.
///
/// Every cell holds one byte. Three byte values are reserved for the fixed
/// opcodes; every other byte is a PUSH whose literal is the byte's distance
/// from `PUSH_BASE`:
/// - `0x01` COPY: pop source offset, destination offset, length; copy cells
/// - `0x02` HALT: kill the executing thread
/// - `0x03` SPAWN: pop an offset; count down the cell's lifespan
/// - anything else: push `byte - PUSH_BASE` (-127..=128)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Copy,
    Halt,
    Spawn,
    Push(i32),
}

pub const COPY: u8 = 1;
pub const HALT: u8 = 2;
pub const SPAWN: u8 = 3;
/// Center of the PUSH band: half the byte domain.
pub const PUSH_BASE: u8 = u8::MAX / 2;

/// Bound on the magnitude of literals produced by random noise.
pub const NOISE_LITERAL_RANGE: i32 = 11;

impl Op {
    /// Decode a cell byte. Total: every byte is some operation.
    #[inline(always)]
    pub fn decode(byte: u8) -> Self {
        match byte {
            COPY => Op::Copy,
            HALT => Op::Halt,
            SPAWN => Op::Spawn,
            v => Op::Push(v as i32 - PUSH_BASE as i32),
        }
    }

    /// Encode back into a cell byte.
    ///
    /// Push literals must lie in `-127..=128` and must not alias one of the
    /// fixed opcodes.
    pub fn encode(self) -> u8 {
        match self {
            Op::Copy => COPY,
            Op::Halt => HALT,
            Op::Spawn => SPAWN,
            Op::Push(literal) => {
                let byte = PUSH_BASE as i32 + literal;
                debug_assert!(
                    (0..=u8::MAX as i32).contains(&byte) && !(1..=3).contains(&byte),
                    "push literal {literal} has no byte encoding"
                );
                byte as u8
            }
        }
    }

    /// Single-character mnemonic used by the text dump.
    pub fn glyph(self) -> char {
        match self {
            Op::Copy => 'C',
            Op::Halt => '.',
            Op::Spawn => 'S',
            Op::Push(0) => '0',
            Op::Push(v) if v > 0 && v < 10 => char::from(b'0' + v as u8),
            Op::Push(v) if v < 0 && v > -10 => char::from(b'a' + (-v - 1) as u8),
            Op::Push(v) if v > 0 => '+',
            Op::Push(_) => '-',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_opcodes() {
        assert_eq!(Op::decode(1), Op::Copy);
        assert_eq!(Op::decode(2), Op::Halt);
        assert_eq!(Op::decode(3), Op::Spawn);
    }

    #[test]
    fn test_push_base_is_zero_literal() {
        assert_eq!(PUSH_BASE, 127);
        assert_eq!(Op::decode(PUSH_BASE), Op::Push(0));
        assert_eq!(Op::decode(PUSH_BASE + 5), Op::Push(5));
        assert_eq!(Op::decode(PUSH_BASE - 11), Op::Push(-11));
    }

    #[test]
    fn test_push_band_extremes() {
        assert_eq!(Op::decode(0), Op::Push(-127));
        assert_eq!(Op::decode(255), Op::Push(128));
        assert_eq!(Op::decode(4), Op::Push(-123));
    }

    #[test]
    fn test_encode_inverts_decode_for_noise_literals() {
        for literal in -NOISE_LITERAL_RANGE..=NOISE_LITERAL_RANGE {
            let byte = Op::Push(literal).encode();
            assert_eq!(Op::decode(byte), Op::Push(literal));
        }
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(Op::Copy.glyph(), 'C');
        assert_eq!(Op::Halt.glyph(), '.');
        assert_eq!(Op::Spawn.glyph(), 'S');
        assert_eq!(Op::Push(7).glyph(), '7');
        assert_eq!(Op::Push(-1).glyph(), 'a');
        assert_eq!(Op::Push(-9).glyph(), 'i');
        assert_eq!(Op::Push(40).glyph(), '+');
        assert_eq!(Op::Push(-40).glyph(), '-');
    }
}
