//! US keyboard layout: 7-bit ASCII to HID usage code plus modifier.
//!
//! Characters without a key (most control codes, DEL) map to usage 0, which
//! sends an empty key-down report.

/// Left Shift in the keyboard report's modifier byte.
pub const SHIFT: u8 = 1 << 1;

/// Number of entries: one per 7-bit character code.
pub const KEYMAP_SIZE: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyMapping {
    /// Usage ID on the Keyboard/Keypad page.
    pub usage: u8,
    /// Modifier bits held while the key is pressed.
    pub modifier: u8,
}

const NONE: KeyMapping = key(0, 0);

const fn key(usage: u8, modifier: u8) -> KeyMapping {
    KeyMapping { usage, modifier }
}

/// Keymap entry for `c`, `None` outside the 7-bit range.
pub fn lookup(c: char) -> Option<KeyMapping> {
    KEYMAP.get(c as usize).copied()
}

#[rustfmt::skip]
static KEYMAP: [KeyMapping; KEYMAP_SIZE] = [
    NONE, // NUL
    NONE, // SOH
    NONE, // STX
    NONE, // ETX
    NONE, // EOT
    NONE, // ENQ
    NONE, // ACK
    NONE, // BEL
    key(0x2a, 0), // BS
    key(0x2b, 0), // TAB
    key(0x28, 0), // LF
    NONE, // VT
    NONE, // FF
    NONE, // CR
    NONE, // SO
    NONE, // SI
    NONE, // DLE
    NONE, // DC1
    NONE, // DC2
    NONE, // DC3
    NONE, // DC4
    NONE, // NAK
    NONE, // SYN
    NONE, // ETB
    NONE, // CAN
    NONE, // EM
    NONE, // SUB
    NONE, // ESC
    NONE, // FS
    NONE, // GS
    NONE, // RS
    NONE, // US
    key(0x2c, 0), // ' '
    key(0x1e, SHIFT), // '!'
    key(0x34, SHIFT), // '"'
    key(0x20, SHIFT), // '#'
    key(0x21, SHIFT), // '$'
    key(0x22, SHIFT), // '%'
    key(0x24, SHIFT), // '&'
    key(0x34, 0), // "'"
    key(0x26, SHIFT), // '('
    key(0x27, SHIFT), // ')'
    key(0x25, SHIFT), // '*'
    key(0x2e, SHIFT), // '+'
    key(0x36, 0), // ','
    key(0x2d, 0), // '-'
    key(0x37, 0), // '.'
    key(0x38, 0), // '/'
    key(0x27, 0), // '0'
    key(0x1e, 0), // '1'
    key(0x1f, 0), // '2'
    key(0x20, 0), // '3'
    key(0x21, 0), // '4'
    key(0x22, 0), // '5'
    key(0x23, 0), // '6'
    key(0x24, 0), // '7'
    key(0x25, 0), // '8'
    key(0x26, 0), // '9'
    key(0x33, SHIFT), // ':'
    key(0x33, 0), // ';'
    key(0x36, SHIFT), // '<'
    key(0x2e, 0), // '='
    key(0x37, SHIFT), // '>'
    key(0x38, SHIFT), // '?'
    key(0x1f, SHIFT), // '@'
    key(0x04, SHIFT), // 'A'
    key(0x05, SHIFT), // 'B'
    key(0x06, SHIFT), // 'C'
    key(0x07, SHIFT), // 'D'
    key(0x08, SHIFT), // 'E'
    key(0x09, SHIFT), // 'F'
    key(0x0a, SHIFT), // 'G'
    key(0x0b, SHIFT), // 'H'
    key(0x0c, SHIFT), // 'I'
    key(0x0d, SHIFT), // 'J'
    key(0x0e, SHIFT), // 'K'
    key(0x0f, SHIFT), // 'L'
    key(0x10, SHIFT), // 'M'
    key(0x11, SHIFT), // 'N'
    key(0x12, SHIFT), // 'O'
    key(0x13, SHIFT), // 'P'
    key(0x14, SHIFT), // 'Q'
    key(0x15, SHIFT), // 'R'
    key(0x16, SHIFT), // 'S'
    key(0x17, SHIFT), // 'T'
    key(0x18, SHIFT), // 'U'
    key(0x19, SHIFT), // 'V'
    key(0x1a, SHIFT), // 'W'
    key(0x1b, SHIFT), // 'X'
    key(0x1c, SHIFT), // 'Y'
    key(0x1d, SHIFT), // 'Z'
    key(0x2f, 0), // '['
    key(0x31, 0), // '\\'
    key(0x30, 0), // ']'
    key(0x23, SHIFT), // '^'
    key(0x2d, SHIFT), // '_'
    key(0x35, 0), // '`'
    key(0x04, 0), // 'a'
    key(0x05, 0), // 'b'
    key(0x06, 0), // 'c'
    key(0x07, 0), // 'd'
    key(0x08, 0), // 'e'
    key(0x09, 0), // 'f'
    key(0x0a, 0), // 'g'
    key(0x0b, 0), // 'h'
    key(0x0c, 0), // 'i'
    key(0x0d, 0), // 'j'
    key(0x0e, 0), // 'k'
    key(0x0f, 0), // 'l'
    key(0x10, 0), // 'm'
    key(0x11, 0), // 'n'
    key(0x12, 0), // 'o'
    key(0x13, 0), // 'p'
    key(0x14, 0), // 'q'
    key(0x15, 0), // 'r'
    key(0x16, 0), // 's'
    key(0x17, 0), // 't'
    key(0x18, 0), // 'u'
    key(0x19, 0), // 'v'
    key(0x1a, 0), // 'w'
    key(0x1b, 0), // 'x'
    key(0x1c, 0), // 'y'
    key(0x1d, 0), // 'z'
    key(0x2f, SHIFT), // '{'
    key(0x31, SHIFT), // '|'
    key(0x30, SHIFT), // '}'
    key(0x35, SHIFT), // '~'
    NONE, // DEL
];
