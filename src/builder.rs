//! Report assembly for the lca_report crate.
//!
//! [`ReportBuilder`] drives the [`LayoutEngine`] through the fixed section order of an assessment
//! report, renders the two charts and the recommendation list, and hands back the finished PDF
//! together with a freshly generated artifact name.  A build either yields a complete document or
//! an error; partial output never leaves this module.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::chart::{self, RenderError};
use crate::layout::{LayoutEngine, PageGeometry, Report, TextStyle};
use crate::model::{InputRecord, PredictionResult};
use crate::predict::{self, PredictionError, Predictor};
use crate::recommend::RecommendationEngine;

pub use crate::layout::ReportBuildError;

/// Title printed at the top of every report unless overridden.
pub const DEFAULT_TITLE: &str = "Life Cycle Assessment (LCA) Report";
/// MIME type of the rendered artifact.
pub const PDF_MIME_TYPE: &str = "application/pdf";

const INPUT_HEADING: &str = "Input Details";
const OUTPUT_HEADING: &str = "Predicted Environmental & Circularity Indicators";
const RECOMMENDATIONS_HEADING: &str = "Recommendations";

const CHART_X: f64 = 350.0;
const BAR_CHART_TOP_OFFSET: f64 = 250.0;
const PIE_CHART_TOP_OFFSET: f64 = 450.0;
const CHART_WIDTH: f64 = 200.0;
const CHART_HEIGHT: f64 = 150.0;

/// Strategy producing the name of each rendered artifact.
///
/// Implementations are called once per build and must not hand out the same name twice, also
/// when builds run concurrently.
pub trait ArtifactNamer: Send + Sync {
    /// Returns a new artifact name.
    fn artifact_name(&self) -> String;
}

/// Names artifacts `<prefix>_<uuid>.pdf` using a random v4 UUID per call.
#[derive(Clone, Debug)]
pub struct UuidNamer {
    prefix: String,
}

impl UuidNamer {
    /// Creates a namer using the given file name prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for UuidNamer {
    fn default() -> Self {
        Self::new("lca_report")
    }
}

impl ArtifactNamer for UuidNamer {
    fn artifact_name(&self) -> String {
        format!("{}_{}.pdf", self.prefix, Uuid::new_v4().simple())
    }
}

/// Any failure that aborts a report build.
#[derive(Debug)]
pub enum ReportError {
    /// The prediction collaborator failed or returned malformed output.
    Prediction(PredictionError),
    /// A chart could not be rendered.
    Render(RenderError),
    /// Layout or serialization failed.
    Build(ReportBuildError),
}

impl From<PredictionError> for ReportError {
    fn from(err: PredictionError) -> Self {
        Self::Prediction(err)
    }
}

impl From<RenderError> for ReportError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl From<ReportBuildError> for ReportError {
    fn from(err: ReportBuildError) -> Self {
        Self::Build(err)
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prediction(err) => write!(f, "Prediction failed: {err}"),
            Self::Render(err) => write!(f, "Chart rendering failed: {err}"),
            Self::Build(err) => write!(f, "Report assembly failed: {err}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Prediction(err) => Some(err),
            Self::Render(err) => Some(err),
            Self::Build(err) => Some(err),
        }
    }
}

/// A finished report: PDF bytes, the artifact name and the laid-out content.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub name: String,
    pub report: Report,
}

impl RenderedReport {
    /// Returns the MIME type of the artifact.
    pub fn mime_type(&self) -> &'static str {
        PDF_MIME_TYPE
    }

    /// Returns the printed text lines in order, excluding chart labels.
    pub fn text_lines(&self) -> Vec<String> {
        self.report
            .text_blocks()
            .filter(|block| !matches!(block.style(), TextStyle::ChartLabel(_)))
            .map(|block| block.text())
            .collect()
    }

    /// Returns the number of embedded images.
    pub fn image_count(&self) -> usize {
        self.report.image_blocks().count()
    }

    /// Writes the artifact into `directory` under its name and returns the full path.
    pub fn write_to_dir(&self, directory: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = directory.as_ref().join(&self.name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Builder for assessment reports pre-configured with the crate defaults.
pub struct ReportBuilder {
    title: String,
    geometry: PageGeometry,
    namer: Box<dyn ArtifactNamer>,
    recommendations: RecommendationEngine,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            geometry: PageGeometry::a4(),
            namer: Box::new(UuidNamer::default()),
            recommendations: RecommendationEngine::standard(),
        }
    }
}

impl ReportBuilder {
    /// Creates a new builder instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the page geometry.
    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Sets the strategy naming each artifact.
    pub fn with_namer(mut self, namer: impl ArtifactNamer + 'static) -> Self {
        self.namer = Box::new(namer);
        self
    }

    /// Sets the rules producing the recommendation section.
    pub fn with_recommendations(mut self, recommendations: RecommendationEngine) -> Self {
        self.recommendations = recommendations;
        self
    }

    /// Runs `predictor` for `input` and builds the report from its output.
    pub fn generate<P>(
        &self,
        predictor: &P,
        input: &InputRecord,
    ) -> Result<RenderedReport, ReportError>
    where
        P: Predictor + ?Sized,
    {
        let prediction = predict::predict(predictor, input).map_err(|err| {
            warn!("Prediction for material '{}' failed: {}", input.material, err);
            err
        })?;
        self.build(input, &prediction)
    }

    /// Builds the report for `input` and its `prediction`.
    pub fn build(
        &self,
        input: &InputRecord,
        prediction: &PredictionResult,
    ) -> Result<RenderedReport, ReportError> {
        match self.assemble(input, prediction) {
            Ok(rendered) => {
                info!(
                    "Generated {} ({} bytes, {} images)",
                    rendered.name,
                    rendered.bytes.len(),
                    rendered.image_count()
                );
                Ok(rendered)
            }
            Err(err) => {
                warn!("Aborted report for material '{}': {:?}", input.material, err);
                Err(err)
            }
        }
    }

    fn assemble(
        &self,
        input: &InputRecord,
        prediction: &PredictionResult,
    ) -> Result<RenderedReport, ReportError> {
        let mut layout = LayoutEngine::new(self.title.clone(), self.geometry);
        layout.write_title(self.title.as_str());

        layout.write_heading(INPUT_HEADING);
        for (label, value) in input.fields() {
            layout.write_field(label, value);
        }

        layout.write_heading(OUTPUT_HEADING);
        for (label, value) in prediction.indicators() {
            layout.write_field(label, value);
        }

        let top = self.geometry.height();
        let bar = chart::environmental_indicators_chart(prediction)?;
        layout.place_chart(
            &bar,
            CHART_X,
            top - BAR_CHART_TOP_OFFSET,
            CHART_WIDTH,
            CHART_HEIGHT,
        )?;
        let pie = chart::recycled_content_chart(prediction)?;
        layout.place_chart(
            &pie,
            CHART_X,
            top - PIE_CHART_TOP_OFFSET,
            CHART_WIDTH,
            CHART_HEIGHT,
        )?;

        layout.write_heading(RECOMMENDATIONS_HEADING);
        let recommendations = self.recommendations.evaluate(prediction);
        debug!("{} recommendations apply", recommendations.len());
        for line in recommendations {
            layout.write_line(format!("- {line}"));
        }

        let (bytes, report) = layout.finish()?;
        Ok(RenderedReport {
            bytes,
            name: self.namer.artifact_name(),
            report,
        })
    }
}
