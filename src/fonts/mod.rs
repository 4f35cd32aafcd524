//! Font selection for rendered reports.
//!
//! Reports are typeset with the standard PDF Helvetica family, which every PDF reader ships, so
//! no font files need to be located at runtime.

use printpdf::{BuiltinFont, IndirectFontRef, PdfDocumentReference};

use crate::layout::{ReportBuildError, TextStyle};

/// Name of the font family used for every text block.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Helvetica";

/// Average advance width of a Helvetica glyph as a fraction of the font size.
const AVERAGE_GLYPH_WIDTH: f64 = 0.5;

/// Font size, in points, used for the given text style.
pub fn font_size(style: TextStyle) -> u8 {
    match style {
        TextStyle::Title => 18,
        TextStyle::Heading => 14,
        TextStyle::Body => 12,
        TextStyle::ChartLabel(size) => size,
    }
}

/// Estimates the rendered width of `text` in points.
///
/// Built-in fonts carry no metrics in the document, so the estimate uses an average glyph width;
/// it is only used to centre chart labels.
pub fn estimated_text_width(text: &str, size: u8) -> f64 {
    text.chars().count() as f64 * f64::from(size) * AVERAGE_GLYPH_WIDTH
}

/// The fonts installed into a document.
pub struct FontSet {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl FontSet {
    /// Adds the regular and bold Helvetica fonts to `document`.
    pub fn install(document: &PdfDocumentReference) -> Result<Self, ReportBuildError> {
        let load = |font: BuiltinFont, name: &str| {
            document.add_builtin_font(font).map_err(|err| {
                ReportBuildError::Font(format!(
                    "Failed to add built-in font '{} {}': {}",
                    DEFAULT_FONT_FAMILY_NAME, name, err
                ))
            })
        };

        Ok(Self {
            regular: load(BuiltinFont::Helvetica, "Regular")?,
            bold: load(BuiltinFont::HelveticaBold, "Bold")?,
        })
    }

    /// Returns the font used for the given text style.
    pub fn font(&self, style: TextStyle) -> &IndirectFontRef {
        match style {
            TextStyle::Title | TextStyle::Heading => &self.bold,
            TextStyle::Body | TextStyle::ChartLabel(_) => &self.regular,
        }
    }
}
