//! The FHP-I/II collision lookup table.
//!
//! Bit layout of a cell (LSB first): six direction bits (0..=5), a rest-particle
//! bit (6), and a wall flag (7). `TABLE[0]` and `TABLE[1]` agree everywhere except
//! at the handful of inputs with two equally valid collision outcomes (a
//! two-particle head-on pair, or a three-particle symmetric triple); those ties
//! are broken per cell by a coin flip in [`Collider`](crate::collider::Collider).

/// Two 256-entry collision tables keyed by incoming cell byte.
///
/// `table[0][b]` and `table[1][b]` are identical unless `b`'s collision has two
/// equally valid outcomes, in which case they hold the two rotations.
pub struct CollisionTable {
    table: [[u8; 256]; 2],
}

// Table 0: wall cells (0x80..=0xFF) are rotated 180 degrees (bounce-back);
// everything else is either left alone or resolved to one of its two possible
// rotations. This is the verbatim FHP-I/II mapping - a design constant, not
// something to re-derive at runtime.
const TABLE0: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x42, 0x06, 0x07, 0x08, 0x24, 0x44, 0x26, 0x0C, 0x4A, 0x0E, 0x0F,
    0x10, 0x60, 0x09, 0x62, 0x48, 0x2A, 0x0D, 0x66, 0x18, 0x34, 0x54, 0x2D, 0x1C, 0x5A, 0x1E, 0x6E,
    0x20, 0x21, 0x41, 0x23, 0x12, 0x13, 0x45, 0x27, 0x50, 0x51, 0x15, 0x53, 0x1A, 0x36, 0x4D, 0x57,
    0x30, 0x31, 0x29, 0x33, 0x68, 0x69, 0x1B, 0x6B, 0x38, 0x39, 0x74, 0x75, 0x3C, 0x7A, 0x5D, 0x3F,
    0x40, 0x22, 0x05, 0x43, 0x0A, 0x0B, 0x46, 0x47, 0x14, 0x64, 0x16, 0x17, 0x4C, 0x56, 0x4E, 0x4F,
    0x28, 0x32, 0x49, 0x65, 0x2C, 0x6A, 0x2E, 0x2F, 0x58, 0x3A, 0x6C, 0x6D, 0x5C, 0x3E, 0x5E, 0x5F,
    0x11, 0x61, 0x25, 0x63, 0x52, 0x2B, 0x4B, 0x67, 0x19, 0x72, 0x55, 0x37, 0x1D, 0x76, 0x1F, 0x6F,
    0x70, 0x71, 0x35, 0x73, 0x59, 0x3B, 0x5B, 0x77, 0x78, 0x79, 0x3D, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    0x80, 0x88, 0x90, 0x98, 0xA0, 0xA8, 0xB0, 0xB8, 0x81, 0x89, 0x91, 0x99, 0xA1, 0xA9, 0xB1, 0xB9,
    0x82, 0x8A, 0x92, 0x9A, 0xA2, 0xAA, 0xB2, 0xBA, 0x83, 0x8B, 0x93, 0x9B, 0xA3, 0xAB, 0xB3, 0xBB,
    0x84, 0x8C, 0x94, 0x9C, 0xA4, 0xAC, 0xB4, 0xBC, 0x85, 0x8D, 0x95, 0x9D, 0xA5, 0xAD, 0xB5, 0xBD,
    0x86, 0x8E, 0x96, 0x9E, 0xA6, 0xAE, 0xB6, 0xBE, 0x87, 0x8F, 0x97, 0x9F, 0xA7, 0xAF, 0xB7, 0xBF,
    0xC0, 0xC8, 0xD0, 0xD8, 0xE0, 0xE8, 0xF0, 0xF8, 0xC1, 0xC9, 0xD1, 0xD9, 0xE1, 0xE9, 0xF1, 0xF9,
    0xC2, 0xCA, 0xD2, 0xDA, 0xE2, 0xEA, 0xF2, 0xFA, 0xC3, 0xCB, 0xD3, 0xDB, 0xE3, 0xEB, 0xF3, 0xFB,
    0xC4, 0xCC, 0xD4, 0xDC, 0xE4, 0xEC, 0xF4, 0xFC, 0xC5, 0xCD, 0xD5, 0xDD, 0xE5, 0xED, 0xF5, 0xFD,
    0xC6, 0xCE, 0xD6, 0xDE, 0xE6, 0xEE, 0xF6, 0xFE, 0xC7, 0xCF, 0xD7, 0xDF, 0xE7, 0xEF, 0xF7, 0xFF,
];

// Table 1 is table 0 with the opposite rotation at every ambiguous entry.
const TABLE1_OVERRIDES: &[(u8, u8)] = &[
    (0x09, 0x12),
    (0x0B, 0x45),
    (0x0D, 0x16),
    (0x12, 0x24),
    (0x13, 0x25),
    (0x16, 0x4A),
    (0x17, 0x4B),
    (0x19, 0x68),
    (0x1A, 0x2C),
    (0x1B, 0x36),
    (0x1D, 0x6C),
    (0x24, 0x09),
    (0x25, 0x62),
    (0x26, 0x0B),
    (0x29, 0x32),
    (0x2B, 0x65),
    (0x2C, 0x54),
    (0x2D, 0x1B),
    (0x2E, 0x56),
    (0x32, 0x51),
    (0x34, 0x19),
    (0x35, 0x72),
    (0x36, 0x2D),
    (0x3A, 0x59),
    (0x45, 0x26),
    (0x49, 0x52),
    (0x4A, 0x0D),
    (0x4B, 0x66),
    (0x4D, 0x2E),
    (0x51, 0x29),
    (0x52, 0x64),
    (0x53, 0x2B),
    (0x54, 0x1A),
    (0x56, 0x4D),
    (0x59, 0x74),
    (0x5A, 0x1D),
    (0x5B, 0x76),
    (0x62, 0x13),
    (0x64, 0x49),
    (0x65, 0x53),
    (0x66, 0x17),
    (0x68, 0x34),
    (0x69, 0x35),
    (0x6C, 0x5A),
    (0x6D, 0x5B),
    (0x72, 0x69),
    (0x74, 0x3A),
    (0x76, 0x6D),
];

fn build_table() -> [[u8; 256]; 2] {
    let mut table1 = TABLE0;
    for &(index, value) in TABLE1_OVERRIDES {
        table1[index as usize] = value;
    }
    [TABLE0, table1]
}

lazy_static! {
    /// The process-wide, immutable collision table. Computed once on first use.
    pub static ref COLLISION_TABLE: CollisionTable = {
        log::debug!("building FHP collision lookup table");
        CollisionTable { table: build_table() }
    };
}

impl CollisionTable {
    /// Raw lookup, `table[k][b]`, mostly useful for tests.
    pub fn raw(&self, k: usize, b: u8) -> u8 {
        self.table[k][b as usize]
    }

    /// True if the outcome for `b` is unambiguous, i.e. both tables agree.
    pub fn is_deterministic(&self, b: u8) -> bool {
        self.table[0][b as usize] == self.table[1][b as usize]
    }

    /// Resolve a single cell through the table, consuming `coin` only if the
    /// outcome for `b` is ambiguous.
    pub fn collide(&self, b: u8, coin: bool) -> u8 {
        let which = if self.is_deterministic(b) { 0 } else { coin as usize };
        self.table[which][b as usize]
    }
}
