use serde::{Deserialize, Serialize};

/// Page geometry and typography for the PDF report. Lengths are millimetres,
/// font sizes are points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSettings {
    pub title: String,

    /// A4 portrait unless overridden
    pub page_width_mm: f64,
    pub page_height_mm: f64,

    /// Left, right and top margin
    pub margin_mm: f64,
    /// Rows and images may not extend into this band at the page bottom
    pub page_break_margin_mm: f64,

    /// Widest column chunk the table stage lays out side by side
    pub columns_per_page: usize,
    /// Narrowest column a full chunk may produce
    pub min_column_width_mm: f64,

    pub title_font_size_pt: f64,
    pub header_font_size_pt: f64,
    pub body_font_size_pt: f64,
    pub summary_font_size_pt: f64,
    /// Table row height as a multiple of the header font size
    pub row_height_factor: f64,
    /// Header fill, grey level 0-255
    pub header_fill_gray: u8,

    pub histogram_x_mm: f64,
    pub histogram_width_mm: f64,
    pub pie_x_mm: f64,
    pub pie_width_mm: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "AI Predictive Maintenance Report".into(),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 10.0,
            page_break_margin_mm: 15.0,
            columns_per_page: 8,
            min_column_width_mm: 12.0,
            title_font_size_pt: 14.0,
            header_font_size_pt: 10.0,
            body_font_size_pt: 9.0,
            summary_font_size_pt: 11.0,
            row_height_factor: 1.5,
            header_fill_gray: 230,
            histogram_x_mm: 15.0,
            histogram_width_mm: 180.0,
            pie_x_mm: 40.0,
            pie_width_mm: 120.0,
        }
    }
}

impl ReportSettings {
    /// Horizontal space between the side margins.
    pub fn usable_width_mm(&self) -> f64 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    /// Lowest y a block may reach before the page breaks.
    pub fn page_break_trigger_mm(&self) -> f64 {
        self.page_height_mm - self.page_break_margin_mm
    }

    /// Vertical space available on a fresh page.
    pub fn usable_height_mm(&self) -> f64 {
        self.page_break_trigger_mm() - self.margin_mm
    }
}
