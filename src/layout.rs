//! Single-page document layout with a moving text cursor.
//!
//! The [`LayoutEngine`] records text and image blocks at absolute positions on one page and only
//! turns them into a PDF when [`LayoutEngine::finish`] is called.  Coordinates are PDF points with
//! the origin in the bottom-left corner; the text cursor starts near the top of the page and only
//! ever moves down.  Content that runs past the bottom edge is not paginated.

use std::fmt;
use std::io::BufWriter;

use image::GenericImageView;
use log::debug;
use printpdf::indices::{PdfLayerIndex, PdfPageIndex};
use printpdf::{Image, Mm, PdfDocument, PdfDocumentReference};

use crate::chart::{LabelAnchor, RasterChart, RenderError};
use crate::fonts::{self, FontSet};

/// Width of an A4 page in points.
pub const A4_WIDTH_PT: f64 = 595.28;
/// Height of an A4 page in points.
pub const A4_HEIGHT_PT: f64 = 841.89;

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;
const DEFAULT_IMAGE_DPI: f64 = 300.0;
const LAYER_NAME: &str = "Report";

fn mm_from_pt(value: f64) -> Mm {
    Mm(value * MM_PER_INCH / POINTS_PER_INCH)
}

/// Page size and text metrics, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    width: f64,
    height: f64,
    top_offset: f64,
    heading_x: f64,
    body_x: f64,
    line_height: f64,
    title_advance: f64,
    section_gap: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: A4_WIDTH_PT,
            height: A4_HEIGHT_PT,
            top_offset: 50.0,
            heading_x: 50.0,
            body_x: 60.0,
            line_height: 20.0,
            title_advance: 30.0,
            section_gap: 10.0,
        }
    }
}

impl PageGeometry {
    /// Creates the default A4 geometry.
    pub fn a4() -> Self {
        Self::default()
    }

    /// Sets the page size and returns the updated geometry.
    pub fn with_page_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the horizontal offsets of headings and body lines.
    pub fn with_indents(mut self, heading_x: f64, body_x: f64) -> Self {
        self.heading_x = heading_x;
        self.body_x = body_x;
        self
    }

    /// Sets the distance the cursor advances after each line; negative values are treated as zero.
    pub fn with_line_height(mut self, line_height: f64) -> Self {
        self.line_height = line_height.max(0.0);
        self
    }

    /// Sets the distance between the top edge and the title baseline.
    pub fn with_top_offset(mut self, top_offset: f64) -> Self {
        self.top_offset = top_offset;
        self
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    /// Y coordinate of the title baseline.
    pub fn top(&self) -> f64 {
        self.height - self.top_offset
    }
}

/// A point on the page in points, measured from the bottom-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Typographic role of a text block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextStyle {
    /// Document title.
    Title,
    /// Section heading.
    Heading,
    /// Regular line of a section.
    Body,
    /// Text printed over a chart, with its font size.
    ChartLabel(u8),
}

/// A line of text placed on the page.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    label: Option<String>,
    value: String,
    style: TextStyle,
    position: Position,
}

impl TextBlock {
    /// Returns the label, for `label: value` lines.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn style(&self) -> TextStyle {
        self.style
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the text as printed.
    pub fn text(&self) -> String {
        match &self.label {
            Some(label) => format!("{}: {}", label, self.value),
            None => self.value.clone(),
        }
    }
}

/// A raster image placed on the page, scaled to the given box.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    bytes: Vec<u8>,
    position: Position,
    width: f64,
    height: f64,
}

impl ImageBlock {
    /// Returns the encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the bottom-left corner of the placement box.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// Individual elements of a report page, in placement order.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

/// The logical content of a report: everything placed on its page, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    title: String,
    blocks: Vec<Block>,
}

impl Report {
    /// Returns the document title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns all placed blocks in placement order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterates over the text blocks.
    pub fn text_blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Text(text) => Some(text),
            Block::Image(_) => None,
        })
    }

    /// Iterates over the image blocks.
    pub fn image_blocks(&self) -> impl Iterator<Item = &ImageBlock> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Image(image) => Some(image),
            Block::Text(_) => None,
        })
    }
}

/// Errors raised while laying out or serializing a report.
#[derive(Debug)]
pub enum ReportBuildError {
    /// A font could not be added to the document.
    Font(String),
    /// A placed image could not be decoded.
    ImageDecode(image::ImageError),
    /// The document could not be written.
    Serialize(String),
    /// Serialization produced no bytes.
    EmptyArtifact,
}

impl fmt::Display for ReportBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Font(message) => f.write_str(message),
            Self::ImageDecode(err) => write!(f, "Failed to decode placed image: {err}"),
            Self::Serialize(message) => write!(f, "Failed to write PDF document: {message}"),
            Self::EmptyArtifact => write!(f, "PDF serialization produced no output"),
        }
    }
}

impl std::error::Error for ReportBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageDecode(err) => Some(err),
            Self::Font(_) | Self::Serialize(_) | Self::EmptyArtifact => None,
        }
    }
}

/// Buffers page content and serializes it into a single-page PDF.
///
/// Nothing is written until [`finish`](Self::finish); each engine owns its own page and cursor.
#[derive(Debug)]
pub struct LayoutEngine {
    geometry: PageGeometry,
    report: Report,
    cursor_y: f64,
}

impl LayoutEngine {
    /// Creates an empty page with the cursor at the title baseline.
    pub fn new(title: impl Into<String>, geometry: PageGeometry) -> Self {
        Self {
            geometry,
            report: Report {
                title: title.into(),
                blocks: Vec::new(),
            },
            cursor_y: geometry.top(),
        }
    }

    /// Returns the page geometry.
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Returns the current vertical cursor position.
    pub fn cursor(&self) -> f64 {
        self.cursor_y
    }

    /// Returns the content placed so far.
    pub fn report(&self) -> &Report {
        &self.report
    }

    fn push_text(&mut self, label: Option<String>, value: String, style: TextStyle, x: f64) {
        self.report.blocks.push(Block::Text(TextBlock {
            label,
            value,
            style,
            position: Position::new(x, self.cursor_y),
        }));
    }

    /// Writes the document title at the cursor and advances past it.
    pub fn write_title(&mut self, text: impl Into<String>) {
        self.push_text(None, text.into(), TextStyle::Title, self.geometry.heading_x);
        self.cursor_y -= self.geometry.title_advance;
    }

    /// Writes a bold section heading below a small gap and advances by one line.
    pub fn write_heading(&mut self, text: impl Into<String>) {
        self.cursor_y -= self.geometry.section_gap;
        self.push_text(None, text.into(), TextStyle::Heading, self.geometry.heading_x);
        self.cursor_y -= self.geometry.line_height;
    }

    /// Writes an indented body line and advances by one line.
    pub fn write_line(&mut self, text: impl Into<String>) {
        self.push_text(None, text.into(), TextStyle::Body, self.geometry.body_x);
        self.cursor_y -= self.geometry.line_height;
    }

    /// Writes an indented `label: value` line and advances by one line.
    pub fn write_field(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.push_text(
            Some(label.into()),
            value.into(),
            TextStyle::Body,
            self.geometry.body_x,
        );
        self.cursor_y -= self.geometry.line_height;
    }

    /// Places encoded image bytes in the box whose bottom-left corner is `(x, y)`.
    ///
    /// The cursor does not move.
    pub fn place_image(&mut self, bytes: Vec<u8>, x: f64, y: f64, width: f64, height: f64) {
        self.report.blocks.push(Block::Image(ImageBlock {
            bytes,
            position: Position::new(x, y),
            width,
            height,
        }));
    }

    /// Places a rendered chart in the given box and prints its labels over it.
    ///
    /// The cursor does not move.
    pub fn place_chart(
        &mut self,
        chart: &RasterChart,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), RenderError> {
        self.place_image(chart.encode_png()?, x, y, width, height);

        for label in chart.labels() {
            let anchor_x = x + label.x * width;
            let text_width = fonts::estimated_text_width(&label.text, label.size);
            let start_x = match label.anchor {
                LabelAnchor::Start => anchor_x,
                LabelAnchor::Middle => anchor_x - text_width / 2.0,
                LabelAnchor::End => anchor_x - text_width,
            };
            self.report.blocks.push(Block::Text(TextBlock {
                label: None,
                value: label.text.clone(),
                style: TextStyle::ChartLabel(label.size),
                position: Position::new(start_x, y + height - label.y * height),
            }));
        }

        debug!(
            "Placed chart '{}' at ({:.1}, {:.1}) sized {:.1}x{:.1}",
            chart.title(),
            x,
            y,
            width,
            height
        );
        Ok(())
    }

    /// Serializes the page into PDF bytes and returns them with the placed content.
    pub fn finish(self) -> Result<(Vec<u8>, Report), ReportBuildError> {
        let (document, page, layer) = PdfDocument::new(
            self.report.title.clone(),
            mm_from_pt(self.geometry.width),
            mm_from_pt(self.geometry.height),
            LAYER_NAME.to_string(),
        );

        draw_blocks(&document, page, layer, &self.report)?;

        let mut writer = BufWriter::new(Vec::new());
        document
            .save(&mut writer)
            .map_err(|err| ReportBuildError::Serialize(err.to_string()))?;
        let bytes = writer
            .into_inner()
            .map_err(|err| ReportBuildError::Serialize(err.to_string()))?;

        if bytes.is_empty() {
            return Err(ReportBuildError::EmptyArtifact);
        }

        debug!(
            "Serialized '{}' with {} blocks into {} bytes",
            self.report.title,
            self.report.blocks.len(),
            bytes.len()
        );
        Ok((bytes, self.report))
    }
}

fn draw_blocks(
    document: &PdfDocumentReference,
    page: PdfPageIndex,
    layer: PdfLayerIndex,
    report: &Report,
) -> Result<(), ReportBuildError> {
    let layer = document.get_page(page).get_layer(layer);
    let font_set = FontSet::install(document)?;

    for block in report.blocks() {
        match block {
            Block::Text(text) => {
                layer.use_text(
                    text.text(),
                    fonts::font_size(text.style).into(),
                    mm_from_pt(text.position.x),
                    mm_from_pt(text.position.y),
                    font_set.font(text.style),
                );
            }
            Block::Image(placed) => {
                let decoded = image::load_from_memory(&placed.bytes)
                    .map_err(ReportBuildError::ImageDecode)?;
                let (px_width, px_height) = decoded.dimensions();
                let natural_width = MM_PER_INCH * f64::from(px_width) / DEFAULT_IMAGE_DPI;
                let natural_height = MM_PER_INCH * f64::from(px_height) / DEFAULT_IMAGE_DPI;
                let scale_x = mm_from_pt(placed.width).0 / natural_width;
                let scale_y = mm_from_pt(placed.height).0 / natural_height;

                Image::from_dynamic_image(&decoded).add_to_layer(
                    layer.clone(),
                    Some(mm_from_pt(placed.position.x)),
                    Some(mm_from_pt(placed.position.y)),
                    None,
                    Some(scale_x),
                    Some(scale_y),
                    Some(DEFAULT_IMAGE_DPI),
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Block, LayoutEngine, PageGeometry, TextStyle, A4_HEIGHT_PT};

    fn engine() -> LayoutEngine {
        LayoutEngine::new("Test", PageGeometry::a4())
    }

    #[test]
    fn cursor_follows_section_rhythm() {
        let mut layout = engine();
        let top = A4_HEIGHT_PT - 50.0;
        assert_eq!(layout.cursor(), top);

        layout.write_title("Title");
        layout.write_heading("Section");
        layout.write_field("Material", "steel");
        layout.write_line("plain");

        let offsets: Vec<f64> = layout
            .report()
            .text_blocks()
            .map(|block| top - block.position().y)
            .collect();
        for (offset, expected) in offsets.iter().zip([0.0, 40.0, 60.0, 80.0]) {
            assert!((offset - expected).abs() < 1e-9, "{offset} != {expected}");
        }
        assert!((top - layout.cursor() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn headings_and_lines_use_their_indents() {
        let mut layout = engine();
        layout.write_heading("Section");
        layout.write_line("body");
        let blocks: Vec<_> = layout.report().text_blocks().cloned().collect();
        assert_eq!(blocks[0].position().x, 50.0);
        assert_eq!(blocks[0].style(), TextStyle::Heading);
        assert_eq!(blocks[1].position().x, 60.0);
        assert_eq!(blocks[1].style(), TextStyle::Body);
    }

    #[test]
    fn custom_geometry_moves_text() {
        let geometry = PageGeometry::a4()
            .with_page_size(612.0, 792.0)
            .with_top_offset(72.0)
            .with_indents(36.0, 48.0)
            .with_line_height(-4.0);
        let mut layout = LayoutEngine::new("Letter", geometry);
        assert_eq!(layout.geometry().width(), 612.0);
        assert_eq!(layout.geometry().line_height(), 0.0);
        assert_eq!(layout.cursor(), 720.0);

        layout.write_heading("Section");
        layout.write_line("body");
        let blocks: Vec<_> = layout.report().text_blocks().cloned().collect();
        assert_eq!(blocks[0].position().x, 36.0);
        assert_eq!(blocks[1].position().x, 48.0);
        assert_eq!(blocks[0].position().y, blocks[1].position().y);
    }

    #[test]
    fn field_text_joins_label_and_value() {
        let mut layout = engine();
        layout.write_field("Route", "primary");
        let block = layout.report().text_blocks().next().cloned().expect("one block");
        assert_eq!(block.label(), Some("Route"));
        assert_eq!(block.text(), "Route: primary");
    }

    #[test]
    fn placing_images_keeps_the_cursor() {
        let mut layout = engine();
        let before = layout.cursor();
        layout.place_image(vec![1, 2, 3], 350.0, 590.0, 200.0, 150.0);
        assert_eq!(layout.cursor(), before);
        assert!(matches!(layout.report().blocks()[0], Block::Image(_)));
    }

    #[test]
    fn finish_produces_pdf_bytes() {
        let mut layout = engine();
        layout.write_title("Title");
        layout.write_line("Hello, PDF!");
        let (bytes, report) = layout.finish().expect("serialized page");
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(report.text_blocks().count(), 2);
    }

    #[test]
    fn undecodable_images_fail_the_page() {
        let mut layout = engine();
        layout.place_image(vec![0, 1, 2, 3], 0.0, 0.0, 10.0, 10.0);
        assert!(layout.finish().is_err());
    }
}
