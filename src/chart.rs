//! Raster chart rendering on top of the [`image`] crate.
//!
//! Every call paints a fresh canvas, so concurrent renders never share plotting state.  Charts are
//! rasterised without text: titles, category names and percentages are returned as
//! [`ChartLabel`]s positioned relative to the canvas, and the layout engine prints them over the
//! placed image with the document fonts.

use std::f64::consts::PI;
use std::fmt;
use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb, RgbImage};
use log::debug;

use crate::model::PredictionResult;

/// Width of every rendered chart in pixels.
pub const CHART_WIDTH_PX: u32 = 400;
/// Height of every rendered chart in pixels; 4:3 like the 200×150 placement box.
pub const CHART_HEIGHT_PX: u32 = 300;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS_COLOR: Rgb<u8> = Rgb([64, 64, 64]);

const TITLE_SIZE: u8 = 11;
const LABEL_SIZE: u8 = 8;
const TITLE_Y_PX: f64 = 22.0;

const PLOT_LEFT_PX: u32 = 50;
const PLOT_RIGHT_PX: u32 = 380;
const PLOT_TOP_PX: u32 = 45;
const PLOT_BOTTOM_PX: u32 = 255;
const BAR_FILL_RATIO: f64 = 0.8;

const PIE_CENTER_PX: (f64, f64) = (200.0, 165.0);
const PIE_RADIUS_PX: f64 = 100.0;
const PIE_LABEL_DISTANCE: f64 = 1.1;
const PIE_PCT_DISTANCE: f64 = 0.6;

/// Errors raised while rendering a chart.
#[derive(Debug)]
pub enum RenderError {
    /// A value was NaN or infinite.
    NonFinite {
        /// Label of the offending category.
        label: String,
        /// The value received.
        value: f64,
    },
    /// Labels, values and colours differ in length.
    MismatchedSeries {
        labels: usize,
        values: usize,
        colors: usize,
    },
    /// The series holds no categories.
    EmptySeries,
    /// A colour name could not be resolved.
    UnknownColor(String),
    /// A pie wedge was negative.
    NegativeWedge {
        /// Label of the offending wedge.
        label: String,
        /// The value received.
        value: f64,
    },
    /// All pie wedges were zero.
    EmptyPie,
    /// The canvas could not be encoded.
    Encode(image::ImageError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { label, value } => {
                write!(f, "Chart value for '{}' is not finite: {}", label, value)
            }
            Self::MismatchedSeries {
                labels,
                values,
                colors,
            } => write!(
                f,
                "Chart series mismatch: {} labels, {} values, {} colours",
                labels, values, colors
            ),
            Self::EmptySeries => write!(f, "Chart series is empty"),
            Self::UnknownColor(name) => write!(f, "Unknown chart colour '{name}'"),
            Self::NegativeWedge { label, value } => {
                write!(f, "Pie wedge '{}' must not be negative: {}", label, value)
            }
            Self::EmptyPie => write!(f, "Pie wedges sum to zero"),
            Self::Encode(err) => write!(f, "Failed to encode chart image: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        Self::Encode(err)
    }
}

/// Resolves a colour given by name or as `#rrggbb`.
pub fn parse_color(name: &str) -> Result<Rgb<u8>, RenderError> {
    let normalized = name.trim().to_ascii_lowercase();
    let rgb = match normalized.as_str() {
        "red" => [255, 0, 0],
        "blue" => [0, 0, 255],
        "green" => [0, 128, 0],
        "gold" => [255, 215, 0],
        "lightgrey" | "lightgray" => [211, 211, 211],
        "grey" | "gray" => [128, 128, 128],
        "orange" => [255, 165, 0],
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        hex if hex.len() == 7 && hex.starts_with('#') => {
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16)
                    .map_err(|_| RenderError::UnknownColor(name.to_string()))
            };
            [channel(1..3)?, channel(3..5)?, channel(5..7)?]
        }
        _ => return Err(RenderError::UnknownColor(name.to_string())),
    };
    Ok(Rgb(rgb))
}

/// Horizontal anchoring of a chart label relative to its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelAnchor {
    /// Text starts at the position.
    Start,
    /// Text is centred on the position.
    Middle,
    /// Text ends at the position.
    End,
}

/// Text printed over a chart, positioned as fractions of the canvas measured from the top-left.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: u8,
    pub anchor: LabelAnchor,
}

impl ChartLabel {
    fn at_px(text: impl Into<String>, x: f64, y: f64, size: u8, anchor: LabelAnchor) -> Self {
        Self {
            text: text.into(),
            x: x / f64::from(CHART_WIDTH_PX),
            y: y / f64::from(CHART_HEIGHT_PX),
            size,
            anchor,
        }
    }
}

/// A rendered chart: the raster canvas together with its overlay labels.
#[derive(Clone, Debug)]
pub struct RasterChart {
    title: String,
    canvas: RgbImage,
    labels: Vec<ChartLabel>,
}

impl RasterChart {
    /// Returns the chart title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the raster canvas.
    pub fn image(&self) -> &RgbImage {
        &self.canvas
    }

    /// Returns the labels to print over the canvas, title first.
    pub fn labels(&self) -> &[ChartLabel] {
        &self.labels
    }

    /// Encodes the canvas as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(self.canvas.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }
}

struct Series {
    labels: Vec<String>,
    values: Vec<f64>,
    colors: Vec<Rgb<u8>>,
}

impl Series {
    fn new(labels: &[&str], values: &[f64], colors: &[&str]) -> Result<Self, RenderError> {
        if labels.len() != values.len() || labels.len() != colors.len() {
            return Err(RenderError::MismatchedSeries {
                labels: labels.len(),
                values: values.len(),
                colors: colors.len(),
            });
        }
        if labels.is_empty() {
            return Err(RenderError::EmptySeries);
        }
        if let Some((label, value)) = labels
            .iter()
            .zip(values)
            .find(|(_, value)| !value.is_finite())
        {
            return Err(RenderError::NonFinite {
                label: label.to_string(),
                value: *value,
            });
        }

        Ok(Self {
            labels: labels.iter().map(|label| label.to_string()).collect(),
            values: values.to_vec(),
            colors: colors
                .iter()
                .map(|color| parse_color(color))
                .collect::<Result<_, _>>()?,
        })
    }
}

fn blank_canvas() -> RgbImage {
    ImageBuffer::from_pixel(CHART_WIDTH_PX, CHART_HEIGHT_PX, BACKGROUND)
}

fn fill_rect(canvas: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(canvas.width());
    let y1 = y1.min(canvas.height());
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn title_label(title: &str) -> ChartLabel {
    ChartLabel::at_px(
        title,
        f64::from(CHART_WIDTH_PX) / 2.0,
        TITLE_Y_PX,
        TITLE_SIZE,
        LabelAnchor::Middle,
    )
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 10.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Renders a vertical bar chart with one bar per category.
///
/// Bars grow from a zero baseline; negative values extend below it.
pub fn render_bar_chart(
    title: &str,
    labels: &[&str],
    values: &[f64],
    colors: &[&str],
) -> Result<RasterChart, RenderError> {
    let series = Series::new(labels, values, colors)?;

    let high = series.values.iter().copied().fold(0.0_f64, f64::max);
    let low = series.values.iter().copied().fold(0.0_f64, f64::min);
    let span = if high - low > f64::EPSILON {
        high - low
    } else {
        1.0
    };

    let top = f64::from(PLOT_TOP_PX);
    let plot_height = f64::from(PLOT_BOTTOM_PX - PLOT_TOP_PX);
    let to_y = |value: f64| top + (high - value) / span * plot_height;
    let baseline = to_y(0.0);

    let mut canvas = blank_canvas();
    let mut overlay = vec![title_label(title)];

    let slot = f64::from(PLOT_RIGHT_PX - PLOT_LEFT_PX) / series.values.len() as f64;
    let inset = slot * (1.0 - BAR_FILL_RATIO) / 2.0;
    for (index, ((label, value), color)) in series
        .labels
        .iter()
        .zip(&series.values)
        .zip(&series.colors)
        .enumerate()
    {
        let slot_start = f64::from(PLOT_LEFT_PX) + slot * index as f64;
        let bar_top = to_y(*value).min(baseline);
        let bar_bottom = to_y(*value).max(baseline);
        fill_rect(
            &mut canvas,
            (slot_start + inset).round() as u32,
            bar_top.round() as u32,
            (slot_start + slot - inset).round() as u32,
            bar_bottom.round() as u32,
            *color,
        );
        overlay.push(ChartLabel::at_px(
            label.as_str(),
            slot_start + slot / 2.0,
            f64::from(PLOT_BOTTOM_PX) + 18.0,
            LABEL_SIZE,
            LabelAnchor::Middle,
        ));
    }

    fill_rect(
        &mut canvas,
        PLOT_LEFT_PX - 1,
        PLOT_TOP_PX,
        PLOT_LEFT_PX + 1,
        PLOT_BOTTOM_PX,
        AXIS_COLOR,
    );
    let baseline_px = baseline.round() as u32;
    fill_rect(
        &mut canvas,
        PLOT_LEFT_PX,
        baseline_px.saturating_sub(1),
        PLOT_RIGHT_PX,
        baseline_px + 1,
        AXIS_COLOR,
    );

    overlay.push(ChartLabel::at_px(
        format_tick(high),
        f64::from(PLOT_LEFT_PX) - 6.0,
        top + 4.0,
        LABEL_SIZE,
        LabelAnchor::End,
    ));
    if low < 0.0 {
        overlay.push(ChartLabel::at_px(
            format_tick(low),
            f64::from(PLOT_LEFT_PX) - 6.0,
            f64::from(PLOT_BOTTOM_PX),
            LABEL_SIZE,
            LabelAnchor::End,
        ));
    }

    debug!(
        "Rendered bar chart '{}' with {} bars",
        title,
        series.values.len()
    );

    Ok(RasterChart {
        title: title.to_string(),
        canvas,
        labels: overlay,
    })
}

/// Returns the share of each wedge in percent of the total.
pub fn pie_percentages(labels: &[&str], values: &[f64]) -> Result<Vec<f64>, RenderError> {
    if labels.len() != values.len() {
        return Err(RenderError::MismatchedSeries {
            labels: labels.len(),
            values: values.len(),
            colors: values.len(),
        });
    }
    for (label, value) in labels.iter().zip(values) {
        if !value.is_finite() {
            return Err(RenderError::NonFinite {
                label: label.to_string(),
                value: *value,
            });
        }
        if *value < 0.0 {
            return Err(RenderError::NegativeWedge {
                label: label.to_string(),
                value: *value,
            });
        }
    }

    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(RenderError::EmptyPie);
    }
    Ok(values.iter().map(|value| value / total * 100.0).collect())
}

/// Renders a pie chart with one wedge per category.
///
/// Wedges start at three o'clock and run counter-clockwise.  Each wedge is labelled with its
/// category outside the pie and its share, to one decimal place, inside.
pub fn render_pie_chart(
    title: &str,
    labels: &[&str],
    values: &[f64],
    colors: &[&str],
) -> Result<RasterChart, RenderError> {
    let series = Series::new(labels, values, colors)?;
    let percentages = pie_percentages(labels, values)?;

    let mut boundaries = Vec::with_capacity(percentages.len());
    let mut cumulative = 0.0;
    for share in &percentages {
        cumulative += share / 100.0;
        boundaries.push(cumulative);
    }

    let (cx, cy) = PIE_CENTER_PX;
    let radius_sq = PIE_RADIUS_PX * PIE_RADIUS_PX;
    let canvas = ImageBuffer::from_fn(CHART_WIDTH_PX, CHART_HEIGHT_PX, |x, y| {
        let dx = f64::from(x) + 0.5 - cx;
        let dy = cy - (f64::from(y) + 0.5);
        if dx * dx + dy * dy > radius_sq {
            return BACKGROUND;
        }
        let fraction = dy.atan2(dx).rem_euclid(2.0 * PI) / (2.0 * PI);
        let wedge = boundaries
            .iter()
            .position(|boundary| fraction < *boundary)
            .unwrap_or(boundaries.len() - 1);
        series.colors[wedge]
    });

    let mut overlay = vec![title_label(title)];
    let mut start = 0.0;
    for (label, share) in series.labels.iter().zip(&percentages) {
        let theta = 2.0 * PI * (start + share / 200.0);
        start += share / 100.0;
        let (cos, sin) = (theta.cos(), theta.sin());

        let anchor = if cos >= 0.0 {
            LabelAnchor::Start
        } else {
            LabelAnchor::End
        };
        overlay.push(ChartLabel::at_px(
            label.as_str(),
            cx + PIE_LABEL_DISTANCE * PIE_RADIUS_PX * cos,
            cy - PIE_LABEL_DISTANCE * PIE_RADIUS_PX * sin,
            LABEL_SIZE,
            anchor,
        ));
        overlay.push(ChartLabel::at_px(
            format!("{:.1}%", share),
            cx + PIE_PCT_DISTANCE * PIE_RADIUS_PX * cos,
            cy - PIE_PCT_DISTANCE * PIE_RADIUS_PX * sin,
            LABEL_SIZE,
            LabelAnchor::Middle,
        ));
    }

    debug!(
        "Rendered pie chart '{}' with {} wedges",
        title,
        percentages.len()
    );

    Ok(RasterChart {
        title: title.to_string(),
        canvas,
        labels: overlay,
    })
}

/// Bar chart of the CO2, water and waste indicators.
pub fn environmental_indicators_chart(
    result: &PredictionResult,
) -> Result<RasterChart, RenderError> {
    render_bar_chart(
        "Environmental Indicators",
        &["CO2", "Water", "Waste"],
        &[result.co2_kg, result.water_l, result.waste_kg],
        &["red", "blue", "green"],
    )
}

/// Pie chart splitting the product into recycled and non-recycled content.
pub fn recycled_content_chart(result: &PredictionResult) -> Result<RasterChart, RenderError> {
    render_pie_chart(
        "Recycled Content",
        &["Recycled", "Non-Recycled"],
        &[result.recycled_content, 100.0 - result.recycled_content],
        &["gold", "lightgrey"],
    )
}
