//! Metrics for the two standard PDF fonts the report uses.

pub const MM_PER_PT: f64 = 25.4 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
}

impl FontStyle {
    /// Resource name used in page content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub style: FontStyle,
    pub size_pt: f64,
}

impl Font {
    pub fn new(style: FontStyle, size_pt: f64) -> Self {
        Self { style, size_pt }
    }

    pub fn size_mm(&self) -> f64 {
        self.size_pt * MM_PER_PT
    }

    /// Rendered width of `text` in millimetres.
    pub fn text_width_mm(&self, text: &str) -> f64 {
        let units: u32 = text.chars().map(|c| glyph_width(self.style, c)).sum();
        f64::from(units) * self.size_mm() / 1000.0
    }

    /// Longest prefix of `text` no wider than `max_mm`.
    pub fn fit<'a>(&self, text: &'a str, max_mm: f64) -> &'a str {
        let limit = max_mm * 1000.0 / self.size_mm();
        let mut used = 0.0;
        for (idx, c) in text.char_indices() {
            used += f64::from(glyph_width(self.style, c));
            if used > limit {
                return &text[..idx];
            }
        }
        text
    }
}

// Advance widths (1/1000 em) for printable ASCII, from the Adobe core font AFMs.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn glyph_width(style: FontStyle, c: char) -> u32 {
    let table = match style {
        FontStyle::Regular => &HELVETICA,
        FontStyle::Bold => &HELVETICA_BOLD,
    };
    match (c as u32).checked_sub(32) {
        Some(idx) if (idx as usize) < table.len() => u32::from(table[idx as usize]),
        // Non-ASCII is written as '?'.
        _ => u32::from(table[('?' as usize) - 32]),
    }
}
