//! Paginated document model and the staged layout that fills it.
//!
//! Coordinates are millimetres from the top-left corner of the page. Every
//! block is placed through [`DocumentBuilder::reserve`], which applies the one
//! page-break policy: a block that would cross the page-break line starts a
//! new page.

use std::fs;
use std::path::Path;

use super::config::ReportSettings;
use super::fonts::{Font, FontStyle};
use super::summary::ReportSummary;
use super::LayoutError;
use crate::inference::ScoredTable;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Horizontal inset of text inside its cell.
pub const CELL_PADDING_MM: f64 = 1.0;

const TITLE_HEIGHT_MM: f64 = 10.0;
const AFTER_TITLE_MM: f64 = 10.0;
const BETWEEN_IMAGES_MM: f64 = 5.0;
const AFTER_IMAGES_MM: f64 = 10.0;
const AFTER_CHUNK_MM: f64 = 5.0;
const SUMMARY_LINE_MM: f64 = 10.0;

/// A decoded chart ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub name: String,
    pub width_px: u32,
    pub height_px: u32,
    /// Packed 8-bit RGB, row-major
    pub rgb: Vec<u8>,
}

impl ChartImage {
    pub fn decode(name: &str, bytes: &[u8]) -> Result<Self, LayoutError> {
        if bytes.is_empty() {
            return Err(LayoutError::MissingImage(name.to_string()));
        }
        let decoded = image::load_from_memory(bytes).map_err(|source| LayoutError::CorruptImage {
            name: name.to_string(),
            source,
        })?;
        let rgb = decoded.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(LayoutError::MissingImage(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            width_px: rgb.width(),
            height_px: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }

    pub fn load(name: &str, path: &Path) -> Result<Self, LayoutError> {
        let bytes = fs::read(path).map_err(|_| LayoutError::MissingImage(name.to_string()))?;
        Self::decode(name, &bytes)
    }

    /// Height / width.
    pub fn aspect(&self) -> f64 {
        f64::from(self.height_px) / f64::from(self.width_px)
    }
}

/// The two charts placed in the image stage, in order.
#[derive(Debug, Clone)]
pub struct ChartSet {
    pub histogram: ChartImage,
    pub pie: ChartImage,
}

/// Contiguous run of table columns laid out side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunk {
    /// Index of the first column in the full table
    pub start: usize,
    pub columns: Vec<String>,
}

impl ColumnChunk {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Split `columns` into left-to-right chunks of at most `per_chunk`.
pub fn chunk_columns(columns: &[String], per_chunk: usize) -> Result<Vec<ColumnChunk>, LayoutError> {
    if columns.is_empty() {
        return Err(LayoutError::NoColumns);
    }
    if per_chunk == 0 {
        return Err(LayoutError::InvalidChunkSize);
    }
    Ok(columns
        .chunks(per_chunk)
        .enumerate()
        .map(|(idx, cols)| ColumnChunk {
            start: idx * per_chunk,
            columns: cols.to_vec(),
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub font: Font,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    /// Index into [`ReportDocument::images`]
    pub image: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Header,
    Data,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCell {
    pub x: f64,
    pub width: f64,
    /// Already truncated to fit the cell
    pub text: String,
}

/// One bordered table row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub kind: RowKind,
    pub y: f64,
    pub height: f64,
    pub font: Font,
    pub align: Align,
    pub fill_gray: Option<u8>,
    pub cells: Vec<PlacedCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextLine),
    Image(PlacedImage),
    Row(TableRow),
}

impl Block {
    /// Lowest y the block touches.
    pub fn bottom(&self) -> f64 {
        match self {
            Block::Text(t) => t.y + t.height,
            Block::Image(i) => i.y + i.height,
            Block::Row(r) => r.y + r.height,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub images: Vec<ChartImage>,
    pub pages: Vec<Page>,
}

impl ReportDocument {
    pub fn rows(&self) -> impl Iterator<Item = &TableRow> {
        self.pages.iter().flat_map(|p| &p.blocks).filter_map(|b| match b {
            Block::Row(row) => Some(row),
            _ => None,
        })
    }

    pub fn text_lines(&self) -> impl Iterator<Item = &TextLine> {
        self.pages.iter().flat_map(|p| &p.blocks).filter_map(|b| match b {
            Block::Text(line) => Some(line),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Header,
    Images,
    Table,
    Summary,
}

/// Cursor over the document under construction.
struct DocumentBuilder<'a> {
    settings: &'a ReportSettings,
    pages: Vec<Page>,
    images: Vec<ChartImage>,
    y: f64,
    stage: Stage,
}

impl<'a> DocumentBuilder<'a> {
    fn new(settings: &'a ReportSettings) -> Self {
        Self {
            settings,
            pages: vec![Page::default()],
            images: Vec::new(),
            y: settings.margin_mm,
            stage: Stage::Header,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage, "layout stages only move forward");
        log_debug!(
            "layout stage {:?} -> {:?} on page {} at y={:.1}",
            self.stage,
            stage,
            self.pages.len(),
            self.y
        );
        self.stage = stage;
    }

    fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.settings.margin_mm;
    }

    /// Page-break policy: returns the y at which a block of `height` goes.
    fn reserve(&mut self, height: f64) -> f64 {
        let at_top = self.y <= self.settings.margin_mm;
        if self.y + height > self.settings.page_break_trigger_mm() && !at_top {
            self.add_page();
        }
        self.y
    }

    fn ln(&mut self, height: f64) {
        self.y += height;
    }

    fn push(&mut self, block: Block) {
        self.y = self.y.max(block.bottom());
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }

    fn text_line(&mut self, text: String, font: Font, height: f64, align: Align) {
        let y = self.reserve(height);
        let line = TextLine {
            x: self.settings.margin_mm,
            y,
            width: self.settings.usable_width_mm(),
            height,
            text,
            font,
            align,
        };
        self.push(Block::Text(line));
    }

    fn image(&mut self, image: ChartImage, x: f64, width: f64) {
        let mut width = width;
        let mut height = width * image.aspect();
        let usable = self.settings.usable_height_mm();
        if height > usable {
            width *= usable / height;
            height = usable;
        }

        let y = self.reserve(height);
        self.images.push(image);
        let placed = PlacedImage {
            image: self.images.len() - 1,
            x,
            y,
            width,
            height,
        };
        self.push(Block::Image(placed));
    }

    fn finish(self) -> ReportDocument {
        ReportDocument {
            title: self.settings.title.clone(),
            page_width_mm: self.settings.page_width_mm,
            page_height_mm: self.settings.page_height_mm,
            images: self.images,
            pages: self.pages,
        }
    }
}

fn row_height_mm(settings: &ReportSettings) -> f64 {
    Font::new(FontStyle::Bold, settings.header_font_size_pt).size_mm() * settings.row_height_factor
}

/// Reject page geometry under which a block could not fit on a fresh page,
/// or a full chunk would be unreadably narrow.
pub fn validate_settings(settings: &ReportSettings) -> Result<(), LayoutError> {
    if settings.columns_per_page == 0 {
        return Err(LayoutError::InvalidChunkSize);
    }

    let row_height = row_height_mm(settings);
    let positive = [
        ("usable page width", settings.usable_width_mm()),
        ("usable page height", settings.usable_height_mm()),
        ("table row height", row_height),
        ("histogram width", settings.histogram_width_mm),
        ("pie chart width", settings.pie_width_mm),
    ];
    for (setting, value) in positive {
        // Written negated so NaN is rejected too.
        if !(value > 0.0) {
            return Err(LayoutError::NonPositive { setting, value });
        }
    }

    let needed = row_height.max(TITLE_HEIGHT_MM).max(SUMMARY_LINE_MM);
    if settings.usable_height_mm() < needed {
        return Err(LayoutError::PageTooShort {
            usable_mm: settings.usable_height_mm(),
            needed_mm: needed,
        });
    }

    let width = settings.usable_width_mm() / settings.columns_per_page as f64;
    if width < settings.min_column_width_mm {
        return Err(LayoutError::ColumnTooNarrow {
            width_mm: width,
            min_mm: settings.min_column_width_mm,
        });
    }
    Ok(())
}

/// Lay out title, charts, chunked table and summary into pages.
pub fn layout_report(
    scored: &ScoredTable,
    charts: ChartSet,
    settings: &ReportSettings,
) -> Result<ReportDocument, LayoutError> {
    validate_settings(settings)?;
    let table = scored.table();
    let chunks = chunk_columns(table.columns(), settings.columns_per_page)?;

    let mut doc = DocumentBuilder::new(settings);

    doc.text_line(
        settings.title.clone(),
        Font::new(FontStyle::Bold, settings.title_font_size_pt),
        TITLE_HEIGHT_MM,
        Align::Center,
    );
    doc.ln(AFTER_TITLE_MM);

    doc.enter(Stage::Images);
    doc.image(charts.histogram, settings.histogram_x_mm, settings.histogram_width_mm);
    doc.ln(BETWEEN_IMAGES_MM);
    doc.image(charts.pie, settings.pie_x_mm, settings.pie_width_mm);
    doc.ln(AFTER_IMAGES_MM);

    doc.enter(Stage::Table);
    let header_font = Font::new(FontStyle::Bold, settings.header_font_size_pt);
    let body_font = Font::new(FontStyle::Regular, settings.body_font_size_pt);
    let row_height = row_height_mm(settings);

    for chunk in &chunks {
        let width = settings.usable_width_mm() / chunk.len() as f64;
        let place = |texts: &mut dyn Iterator<Item = String>, font: Font| -> Vec<PlacedCell> {
            texts
                .enumerate()
                .map(|(i, text)| PlacedCell {
                    x: settings.margin_mm + i as f64 * width,
                    width,
                    text: font.fit(&text, width - 2.0 * CELL_PADDING_MM).to_string(),
                })
                .collect()
        };

        let y = doc.reserve(row_height);
        let header = TableRow {
            kind: RowKind::Header,
            y,
            height: row_height,
            font: header_font,
            align: Align::Center,
            fill_gray: Some(settings.header_fill_gray),
            cells: place(&mut chunk.columns.iter().cloned(), header_font),
        };
        doc.push(Block::Row(header));

        let range = chunk.start..chunk.start + chunk.len();
        for record in table.rows() {
            let y = doc.reserve(row_height);
            let row = TableRow {
                kind: RowKind::Data,
                y,
                height: row_height,
                font: body_font,
                align: Align::Left,
                fill_gray: None,
                cells: place(&mut record[range.clone()].iter().map(|c| c.to_string()), body_font),
            };
            doc.push(Block::Row(row));
        }
        doc.ln(AFTER_CHUNK_MM);
    }

    doc.enter(Stage::Summary);
    let summary_font = Font::new(FontStyle::Regular, settings.summary_font_size_pt);
    for line in ReportSummary::from_scored(scored).lines() {
        doc.text_line(line, summary_font, SUMMARY_LINE_MM, Align::Left);
    }

    let document = doc.finish();
    log_debug!(
        "laid out {} pages: {} column chunks, {} table rows",
        document.pages.len(),
        chunks.len(),
        document.rows().count()
    );
    Ok(document)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::align::align_features;
    use crate::inference::{score, Predictions};
    use crate::schema::FeatureSchema;
    use crate::table::{Cell, Table};
    use image::{ImageFormat, Rgb, RgbImage};
    use proptest::prelude::*;
    use std::io::Cursor;

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    pub(crate) fn charts() -> ChartSet {
        ChartSet {
            histogram: ChartImage::decode("histogram", &png(70, 50)).unwrap(),
            pie: ChartImage::decode("pie", &png(70, 50)).unwrap(),
        }
    }

    pub(crate) fn scored_rows(n: usize) -> ScoredTable {
        let schema = FeatureSchema::turbofan();
        let mut table = Table::new(vec!["sensor_1".into()]).unwrap();
        for i in 0..n {
            table.push_row(vec![Cell::Int(i as i64)]).unwrap();
        }
        let aligned = align_features(&table, &schema);
        let labels: Vec<u8> = (0..n).map(|i| (i % 2) as u8).collect();
        let probabilities = (0..n).map(|i| (i % 10) as f64 / 10.0).collect();
        score(aligned, Predictions { labels, probabilities }).unwrap()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{i}")).collect()
    }

    #[test]
    fn thirty_columns_split_eight_eight_eight_six() {
        let chunks = chunk_columns(&names(30), 8).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(ColumnChunk::len).collect();
        assert_eq!(sizes, vec![8, 8, 8, 6]);
        assert_eq!(chunks[3].start, 24);
    }

    #[test]
    fn chunking_rejects_degenerate_input() {
        assert!(matches!(chunk_columns(&[], 8), Err(LayoutError::NoColumns)));
        assert!(matches!(chunk_columns(&names(3), 0), Err(LayoutError::InvalidChunkSize)));
    }

    #[test]
    fn too_many_columns_per_page_is_rejected() {
        let settings = ReportSettings {
            columns_per_page: 40,
            ..ReportSettings::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(LayoutError::ColumnTooNarrow { .. })
        ));
        assert!(validate_settings(&ReportSettings::default()).is_ok());
    }

    #[test]
    fn short_pages_are_rejected() {
        let negative = ReportSettings {
            page_height_mm: 20.0,
            ..ReportSettings::default()
        };
        assert!(matches!(
            layout_report(&scored_rows(3), charts(), &negative),
            Err(LayoutError::NonPositive { setting: "usable page height", .. })
        ));

        // 5 mm of usable height cannot hold a 10 mm title line.
        let cramped = ReportSettings {
            page_height_mm: 30.0,
            ..ReportSettings::default()
        };
        assert!(matches!(
            layout_report(&scored_rows(3), charts(), &cramped),
            Err(LayoutError::PageTooShort { .. })
        ));
    }

    #[test]
    fn degenerate_widths_are_rejected() {
        let no_width = ReportSettings {
            margin_mm: 105.0,
            ..ReportSettings::default()
        };
        assert!(matches!(
            validate_settings(&no_width),
            Err(LayoutError::NonPositive { setting: "usable page width", .. })
        ));

        let no_pie = ReportSettings {
            pie_width_mm: f64::NAN,
            ..ReportSettings::default()
        };
        assert!(matches!(
            validate_settings(&no_pie),
            Err(LayoutError::NonPositive { setting: "pie chart width", .. })
        ));
    }

    #[test]
    fn stages_are_emitted_in_order() {
        let settings = ReportSettings::default();
        let doc = layout_report(&scored_rows(3), charts(), &settings).unwrap();

        let first = &doc.pages[0].blocks;
        assert!(matches!(&first[0], Block::Text(t) if t.text == settings.title));
        assert!(matches!(first[1], Block::Image(PlacedImage { image: 0, .. })));
        assert!(matches!(first[2], Block::Image(PlacedImage { image: 1, .. })));
        assert!(matches!(&first[3], Block::Row(r) if r.kind == RowKind::Header));

        let last_page = doc.pages.last().unwrap();
        assert!(matches!(
            last_page.blocks.last(),
            Some(Block::Text(t)) if t.text.starts_with("Avg Failure Probability")
        ));
    }

    #[test]
    fn row_height_comes_from_header_font() {
        let settings = ReportSettings::default();
        let doc = layout_report(&scored_rows(2), charts(), &settings).unwrap();
        let expected = 10.0 * 25.4 / 72.0 * 1.5;
        assert!(doc.rows().all(|r| (r.height - expected).abs() < 1e-9));
    }

    #[test]
    fn header_rows_are_bold_and_filled() {
        let doc = layout_report(&scored_rows(2), charts(), &ReportSettings::default()).unwrap();
        for row in doc.rows() {
            match row.kind {
                RowKind::Header => {
                    assert_eq!(row.font.style, FontStyle::Bold);
                    assert_eq!(row.fill_gray, Some(230));
                }
                RowKind::Data => {
                    assert_eq!(row.font.style, FontStyle::Regular);
                    assert_eq!(row.fill_gray, None);
                }
            }
        }
    }

    #[test]
    fn chunks_partition_columns_and_fill_page_width() {
        let settings = ReportSettings::default();
        let scored = scored_rows(1);
        let doc = layout_report(&scored, charts(), &settings).unwrap();

        let headers: Vec<&TableRow> = doc.rows().filter(|r| r.kind == RowKind::Header).collect();
        let sizes: Vec<usize> = headers.iter().map(|r| r.cells.len()).collect();
        // 24 schema + 2 score columns at 8 per chunk.
        assert_eq!(sizes, vec![8, 8, 8, 2]);
        // Long names are cut to the column width.
        let first = &headers[0].cells[0].text;
        assert!(!first.is_empty() && "operational_setting_1".starts_with(first.as_str()));
        assert_eq!(headers[3].cells[0].text, "Prediction");
        for row in doc.rows() {
            let total: f64 = row.cells.iter().map(|c| c.width).sum();
            assert!((total - settings.usable_width_mm()).abs() < 1e-9);
        }
    }

    #[test]
    fn tall_images_are_scaled_to_fit_one_page() {
        let settings = ReportSettings::default();
        let tall = ChartSet {
            histogram: ChartImage::decode("histogram", &png(10, 100)).unwrap(),
            pie: ChartImage::decode("pie", &png(10, 100)).unwrap(),
        };
        let doc = layout_report(&scored_rows(1), tall, &settings).unwrap();
        for page in &doc.pages {
            for block in &page.blocks {
                assert!(block.bottom() <= settings.page_break_trigger_mm() + 1e-9);
            }
        }
    }

    #[test]
    fn corrupt_and_missing_images_fail() {
        assert!(matches!(
            ChartImage::decode("pie", b"not a png"),
            Err(LayoutError::CorruptImage { .. })
        ));
        assert!(matches!(
            ChartImage::decode("pie", &[]),
            Err(LayoutError::MissingImage(_))
        ));
        assert!(matches!(
            ChartImage::load("pie", Path::new("/nonexistent/pie.png")),
            Err(LayoutError::MissingImage(_))
        ));
    }

    proptest! {
        #[test]
        fn chunks_cover_columns_once_in_order(n in 1usize..120, per in 1usize..=15) {
            let settings = ReportSettings { columns_per_page: per, ..ReportSettings::default() };
            let columns = names(n);
            let chunks = chunk_columns(&columns, per).unwrap();

            let rejoined: Vec<String> = chunks.iter().flat_map(|c| c.columns.clone()).collect();
            prop_assert_eq!(rejoined, columns);
            prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= per));
            if validate_settings(&settings).is_ok() {
                for chunk in &chunks {
                    prop_assert!(settings.usable_width_mm() / chunk.len() as f64 >= settings.min_column_width_mm);
                }
            }
        }

        #[test]
        fn accepted_page_heights_keep_blocks_above_the_break_line(height in 10.0f64..120.0, n in 0usize..20) {
            let settings = ReportSettings { page_height_mm: height, ..ReportSettings::default() };
            if let Ok(doc) = layout_report(&scored_rows(n), charts(), &settings) {
                for block in doc.pages.iter().flat_map(|p| &p.blocks) {
                    prop_assert!(block.bottom() <= settings.page_break_trigger_mm() + 1e-9);
                    if let Block::Image(image) = block {
                        prop_assert!(image.width > 0.0 && image.height > 0.0);
                    }
                }
            }
        }

        #[test]
        fn rows_never_cross_the_page_break_line(n in 0usize..150, per in 4usize..=12) {
            let settings = ReportSettings { columns_per_page: per, ..ReportSettings::default() };
            let scored = scored_rows(n);
            let doc = layout_report(&scored, charts(), &settings).unwrap();

            let n_chunks = scored.table().n_cols().div_ceil(per);
            prop_assert_eq!(doc.rows().count(), n_chunks * (n + 1));
            for row in doc.rows() {
                prop_assert!(row.y + row.height <= settings.page_break_trigger_mm() + 1e-9);
            }
        }
    }
}
