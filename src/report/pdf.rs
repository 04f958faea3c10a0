//! Serializes a laid-out [`ReportDocument`] with `lopdf`.

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::fonts::{Font, FontStyle, MM_PER_PT};
use super::layout::{Align, Block, PlacedImage, ReportDocument, TableRow, TextLine, CELL_PADDING_MM};
use super::ReportError;

const LINE_WIDTH_MM: f64 = 0.2;

/// Writes [`ReportDocument`]s as PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    creation_date: Option<DateTime<Utc>>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the Info dictionary; without it the output depends only on the document.
    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn write(&self, report: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for style in [FontStyle::Regular, FontStyle::Bold] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => style.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(style.resource_name(), font_id);
        }

        let mut xobjects = Dictionary::new();
        for (idx, image) in report.images.iter().enumerate() {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width_px),
                "Height" => i64::from(image.height_px),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            };
            let image_id = doc.add_object(Stream::new(dict, image.rgb.clone()));
            xobjects.set(image_resource(idx), image_id);
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        let page_h_pt = report.page_height_mm / MM_PER_PT;
        let mut kids: Vec<Object> = Vec::with_capacity(report.pages.len());
        for page in &report.pages {
            let mut ops = Painter::new(page_h_pt);
            for block in &page.blocks {
                match block {
                    Block::Text(line) => ops.text_line(line),
                    Block::Image(image) => ops.image(image),
                    Block::Row(row) => ops.row(row),
                }
            }
            let content = Content {
                operations: ops.finish(),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                real(report.page_width_mm / MM_PER_PT),
                real(page_h_pt),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Title" => Object::string_literal(report.title.as_str()),
            "Producer" => Object::string_literal(concat!("enginehealth ", env!("CARGO_PKG_VERSION"))),
        };
        if let Some(date) = self.creation_date {
            let stamp = date.format("D:%Y%m%d%H%M%SZ").to_string();
            info.set("CreationDate", Object::string_literal(stamp));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn image_resource(idx: usize) -> String {
    format!("Im{}", idx + 1)
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Only ASCII glyphs are in the standard encoding we rely on.
fn pdf_text(text: &str) -> Object {
    let ascii: String = text
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect();
    Object::string_literal(ascii)
}

/// Accumulates operators for one page, converting top-left millimetres to
/// bottom-left points.
struct Painter {
    page_h_pt: f64,
    ops: Vec<Operation>,
}

impl Painter {
    fn new(page_h_pt: f64) -> Self {
        let ops = vec![
            Operation::new("w", vec![real(LINE_WIDTH_MM / MM_PER_PT)]),
            Operation::new("RG", vec![0.into(), 0.into(), 0.into()]),
        ];
        Self { page_h_pt, ops }
    }

    fn x(&self, mm: f64) -> Object {
        real(mm / MM_PER_PT)
    }

    fn y(&self, mm: f64) -> Object {
        real(self.page_h_pt - mm / MM_PER_PT)
    }

    fn text(&mut self, text: &str, style: FontStyle, size_pt: f64, x_mm: f64, baseline_mm: f64) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![style.resource_name().into(), real(size_pt)]),
            Operation::new("Td", vec![self.x(x_mm), self.y(baseline_mm)]),
            Operation::new("Tj", vec![pdf_text(text)]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Draw `text` inside the box at (`x`, `y`), vertically centred.
    fn boxed_text(&mut self, text: &str, font: Font, align: Align, x: f64, y: f64, w: f64, h: f64) {
        if text.is_empty() {
            return;
        }
        let dx = match align {
            Align::Left => CELL_PADDING_MM,
            Align::Center => (w - font.text_width_mm(text)) / 2.0,
        };
        let baseline = y + 0.5 * h + 0.3 * font.size_mm();
        self.text(text, font.style, font.size_pt, x + dx, baseline);
    }

    fn text_line(&mut self, line: &TextLine) {
        self.ops.push(Operation::new("g", vec![0.into()]));
        self.boxed_text(&line.text, line.font, line.align, line.x, line.y, line.width, line.height);
    }

    fn row(&mut self, row: &TableRow) {
        let paint = match row.fill_gray {
            Some(gray) => {
                self.ops.push(Operation::new("g", vec![real(f64::from(gray) / 255.0)]));
                "B"
            }
            None => "S",
        };
        for cell in &row.cells {
            self.ops.push(Operation::new(
                "re",
                vec![
                    self.x(cell.x),
                    self.y(row.y),
                    real(cell.width / MM_PER_PT),
                    real(-row.height / MM_PER_PT),
                ],
            ));
            self.ops.push(Operation::new(paint, vec![]));
        }

        self.ops.push(Operation::new("g", vec![0.into()]));
        for cell in &row.cells {
            self.boxed_text(&cell.text, row.font, row.align, cell.x, row.y, cell.width, row.height);
        }
    }

    fn image(&mut self, image: &PlacedImage) {
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(image.width / MM_PER_PT),
                    0.into(),
                    0.into(),
                    real(image.height / MM_PER_PT),
                    self.x(image.x),
                    self.y(image.y + image.height),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_resource(image.image).into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn finish(self) -> Vec<Operation> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::config::ReportSettings;
    use crate::report::layout::layout_report;
    use crate::report::layout::tests::{charts, scored_rows};
    use chrono::TimeZone;

    fn render(rows: usize) -> (ReportDocument, Vec<u8>) {
        let doc = layout_report(&scored_rows(rows), charts(), &ReportSettings::default()).unwrap();
        let bytes = PdfWriter::new().write(&doc).unwrap();
        (doc, bytes)
    }

    #[test]
    fn output_is_a_pdf_with_one_page_per_layout_page() {
        let (doc, bytes) = render(120);
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(doc.pages.len() > 1);

        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), doc.pages.len());
    }

    #[test]
    fn output_is_deterministic_without_a_date() {
        let (_, first) = render(5);
        let (_, second) = render(5);
        assert_eq!(first, second);
    }

    #[test]
    fn creation_date_lands_in_info() {
        let doc = layout_report(&scored_rows(1), charts(), &ReportSettings::default()).unwrap();
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let bytes = PdfWriter::new().with_creation_date(date).write(&doc).unwrap();

        let needle = b"D:20260301123000Z";
        assert!(bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn summary_text_is_written_to_the_last_page() {
        let (_, bytes) = render(3);
        let parsed = Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        let last = *pages.values().last().unwrap();
        let content = parsed.get_page_content(last).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("Total Engines: 3"));
    }

    #[test]
    fn non_ascii_is_replaced() {
        match pdf_text("Temp \u{b0}C") {
            Object::String(bytes, _) => assert_eq!(bytes, b"Temp ?C"),
            other => panic!("expected a string object, got {other:?}"),
        }
    }
}
