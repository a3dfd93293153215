//! Packed cell attribute word.
//!
//! Layout (low to high):
//! * bits 0..12   foreground, 4 bits per RGB channel
//! * bits 12..24  background, 4 bits per RGB channel
//! * bit 24       underline
//! * bit 25       negative (inverse)
//! * bit 26       concealed
//! * bit 27       bold
//! * bit 28       foreground explicitly set
//! * bit 29       background explicitly set
//!
//! Colors without their "set" bit inherit whatever default the renderer
//! resolves at emission time.

const FG_SHIFT: u32 = 0;
const BG_SHIFT: u32 = 12;
const COLOR_MASK: u32 = 0xfff;

const UNDERLINE: u32 = 1 << 24;
const NEGATIVE: u32 = 1 << 25;
const CONCEALED: u32 = 1 << 26;
const BOLD: u32 = 1 << 27;
const FG_SET: u32 = 1 << 28;
const BG_SET: u32 = 1 << 29;

/// The 32-bit style component of a screen cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct AttrWord(u32);

impl AttrWord {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn underline(self) -> bool {
        self.0 & UNDERLINE != 0
    }

    pub fn negative(self) -> bool {
        self.0 & NEGATIVE != 0
    }

    pub fn concealed(self) -> bool {
        self.0 & CONCEALED != 0
    }

    pub fn bold(self) -> bool {
        self.0 & BOLD != 0
    }

    /// Foreground as a 12-bit RGB444 value, if explicitly set.
    pub fn fg(self) -> Option<u16> {
        (self.0 & FG_SET != 0).then(|| ((self.0 >> FG_SHIFT) & COLOR_MASK) as u16)
    }

    /// Background as a 12-bit RGB444 value, if explicitly set.
    pub fn bg(self) -> Option<u16> {
        (self.0 & BG_SET != 0).then(|| ((self.0 >> BG_SHIFT) & COLOR_MASK) as u16)
    }

    pub fn with_fg(self, rgb444: u16) -> Self {
        Self(
            (self.0 & !(COLOR_MASK << FG_SHIFT))
                | ((rgb444 as u32 & COLOR_MASK) << FG_SHIFT)
                | FG_SET,
        )
    }

    pub fn with_bg(self, rgb444: u16) -> Self {
        Self(
            (self.0 & !(COLOR_MASK << BG_SHIFT))
                | ((rgb444 as u32 & COLOR_MASK) << BG_SHIFT)
                | BG_SET,
        )
    }

    pub fn without_fg(self) -> Self {
        Self(self.0 & !((COLOR_MASK << FG_SHIFT) | FG_SET))
    }

    pub fn without_bg(self) -> Self {
        Self(self.0 & !((COLOR_MASK << BG_SHIFT) | BG_SET))
    }

    fn set(self, bit: u32, on: bool) -> Self {
        if on { Self(self.0 | bit) } else { Self(self.0 & !bit) }
    }

    pub fn with_bold(self, on: bool) -> Self {
        self.set(BOLD, on)
    }

    pub fn with_underline(self, on: bool) -> Self {
        self.set(UNDERLINE, on)
    }

    pub fn with_negative(self, on: bool) -> Self {
        self.set(NEGATIVE, on)
    }

    pub fn with_concealed(self, on: bool) -> Self {
        self.set(CONCEALED, on)
    }

    /// Swap foreground and background, preserving the "set" bits pairing.
    /// Used by inverse-video emission (DECSCNM and the negative style bit).
    pub fn swapped(self) -> Self {
        let fg = self.fg();
        let bg = self.bg();
        let mut out = Self(self.0 & !((COLOR_MASK << FG_SHIFT) | (COLOR_MASK << BG_SHIFT) | FG_SET | BG_SET));
        if let Some(c) = bg {
            out = out.with_fg(c);
        }
        if let Some(c) = fg {
            out = out.with_bg(c);
        }
        out
    }

    /// Apply one SGR parameter list to this attribute word.
    ///
    /// Follows the standard table: 0 reset, 1/21/22 bold, 4/24 underline,
    /// 7/27 inverse, 8/28 conceal, 30–37/40–47 indexed colors, 90–97 and
    /// 100–107 bright variants, 38;5;n / 48;5;n 256-color, 39/49 defaults.
    /// Unknown parameters are ignored.
    pub fn apply_sgr(self, params: &[u16]) -> Self {
        let mut out = self;
        let mut i = 0;
        if params.is_empty() {
            return Self::default();
        }
        while i < params.len() {
            match params[i] {
                0 => out = Self::default(),
                1 => out = out.with_bold(true),
                4 => out = out.with_underline(true),
                7 => out = out.with_negative(true),
                8 => out = out.with_concealed(true),
                21 | 22 => out = out.with_bold(false),
                24 => out = out.with_underline(false),
                27 => out = out.with_negative(false),
                28 => out = out.with_concealed(false),
                n @ 30..=37 => out = out.with_fg(indexed_rgb444((n - 30) as u8)),
                38 => {
                    if params.get(i + 1) == Some(&5)
                        && let Some(&n) = params.get(i + 2)
                    {
                        out = out.with_fg(indexed_rgb444(n.min(255) as u8));
                        i += 2;
                    }
                }
                39 => out = out.without_fg(),
                n @ 40..=47 => out = out.with_bg(indexed_rgb444((n - 40) as u8)),
                48 => {
                    if params.get(i + 1) == Some(&5)
                        && let Some(&n) = params.get(i + 2)
                    {
                        out = out.with_bg(indexed_rgb444(n.min(255) as u8));
                        i += 2;
                    }
                }
                49 => out = out.without_bg(),
                n @ 90..=97 => out = out.with_fg(indexed_rgb444((n - 90 + 8) as u8)),
                n @ 100..=107 => out = out.with_bg(indexed_rgb444((n - 100 + 8) as u8)),
                _ => {}
            }
            i += 1;
        }
        out
    }

    /// Expand a 12-bit RGB444 value into 8-bit channels.
    pub fn expand(rgb444: u16) -> (u8, u8, u8) {
        let r = ((rgb444 >> 8) & 0xf) as u8;
        let g = ((rgb444 >> 4) & 0xf) as u8;
        let b = (rgb444 & 0xf) as u8;
        (r * 17, g * 17, b * 17)
    }
}

/// The base 16 colors of the xterm palette as 24-bit RGB.
const BASE16: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0xcd, 0x00, 0x00),
    (0x00, 0xcd, 0x00),
    (0xcd, 0xcd, 0x00),
    (0x00, 0x00, 0xee),
    (0xcd, 0x00, 0xcd),
    (0x00, 0xcd, 0xcd),
    (0xe5, 0xe5, 0xe5),
    (0x7f, 0x7f, 0x7f),
    (0xff, 0x00, 0x00),
    (0x00, 0xff, 0x00),
    (0xff, 0xff, 0x00),
    (0x5c, 0x5c, 0xff),
    (0xff, 0x00, 0xff),
    (0x00, 0xff, 0xff),
    (0xff, 0xff, 0xff),
];

fn rgb444(r: u8, g: u8, b: u8) -> u16 {
    (((r >> 4) as u16) << 8) | (((g >> 4) as u16) << 4) | ((b >> 4) as u16)
}

/// Convert an xterm 256-color index to its 4-bit-per-channel approximation.
pub fn indexed_rgb444(index: u8) -> u16 {
    match index {
        0..=15 => {
            let (r, g, b) = BASE16[index as usize];
            rgb444(r, g, b)
        }
        16..=231 => {
            // 6x6x6 color cube with levels 0, 95, 135, 175, 215, 255.
            const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
            let n = index - 16;
            let r = LEVELS[(n / 36) as usize];
            let g = LEVELS[((n / 6) % 6) as usize];
            let b = LEVELS[(n % 6) as usize];
            rgb444(r, g, b)
        }
        232..=255 => {
            let v = 8 + 10 * (index - 232);
            rgb444(v, v, v)
        }
    }
}
