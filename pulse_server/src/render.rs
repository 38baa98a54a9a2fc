//! PNG chart rendering with plotters.
//!
//! Charts are drawn into an in-memory RGB buffer and encoded as PNG, so
//! nothing touches the local filesystem. Text needs a registered font. Without
//! one the renderer draws series only.

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use pulse_forecast::report::{ChartRenderer, ChartSpec, SeriesKind};
use pulse_forecast::{ForecastError, Result};
use std::fmt::Display;
use std::ops::Range;

const FONT_FAMILY: &str = "pulse-sans";
const MAX_X_LABELS: usize = 12;
const BAR_HALF_WIDTH: f64 = 0.4;

const PALETTE: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
];

fn render_error<E: Display>(e: E) -> ForecastError {
    ForecastError::Render(e.to_string())
}

/// Draws [`ChartSpec`]s as PNG images
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    width: u32,
    height: u32,
    text: bool,
}

impl PlottersRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: false,
        }
    }

    /// Register a TrueType font for titles, axis labels and legends.
    ///
    /// The font registry is process-wide, so this is meant to run once at startup.
    pub fn with_font(mut self, bytes: Vec<u8>) -> Result<Self> {
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        register_font(FONT_FAMILY, FontStyle::Normal, bytes)
            .map_err(|_| ForecastError::Render("Invalid chart font".to_string()))?;
        self.text = true;
        Ok(self)
    }

    pub fn draws_text(&self) -> bool {
        self.text
    }

    fn draw(&self, spec: &ChartSpec, buffer: &mut [u8]) -> Result<()> {
        let root = BitMapBackend::with_buffer(buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let (x_range, y_range) = bounds(spec);
        let mut builder = ChartBuilder::on(&root);
        builder.margin(16);
        if self.text {
            builder
                .caption(&spec.title, (FONT_FAMILY, 22))
                .x_label_area_size(40)
                .y_label_area_size(56);
        }
        let mut chart = builder
            .build_cartesian_2d(x_range, y_range)
            .map_err(render_error)?;

        if self.text {
            let ticks = &spec.x_ticks;
            let tick_label = |x: &f64| {
                let i = x.round();
                if (x - i).abs() > 1e-6 || i < 0.0 {
                    return String::new();
                }
                ticks.get(i as usize).cloned().unwrap_or_default()
            };

            let mut mesh = chart.configure_mesh();
            mesh.x_desc(spec.x_label.as_str())
                .y_desc(spec.y_label.as_str())
                .label_style((FONT_FAMILY, 12))
                .axis_desc_style((FONT_FAMILY, 14));
            if !ticks.is_empty() {
                mesh.x_labels(ticks.len().min(MAX_X_LABELS))
                    .x_label_formatter(&tick_label);
            }
            mesh.draw().map_err(render_error)?;
        }

        for (i, series) in spec.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<(f64, f64)> = series.points.iter().map(|p| (p.x, p.y)).collect();

            let annotation = match series.kind {
                SeriesKind::Line => chart.draw_series(LineSeries::new(points, color.stroke_width(2))),
                SeriesKind::Markers => {
                    chart
                        .draw_series(LineSeries::new(points.clone(), color.stroke_width(1)))
                        .map_err(render_error)?;
                    chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))
                }
                SeriesKind::Bar => chart.draw_series(series.points.iter().map(|p| {
                    Rectangle::new(
                        [(p.x - BAR_HALF_WIDTH, p.base), (p.x + BAR_HALF_WIDTH, p.y)],
                        color.filled(),
                    )
                })),
            }
            .map_err(render_error)?;

            if self.text {
                annotation
                    .label(series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
            }
        }

        if self.text && spec.series.len() > 1 {
            chart
                .configure_series_labels()
                .label_font((FONT_FAMILY, 12))
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(render_error)?;
        }

        root.present().map_err(render_error)
    }

    fn encode_png(&self, buffer: &[u8]) -> Result<Vec<u8>> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(buffer, self.width, self.height, ColorType::Rgb8)
            .map_err(render_error)?;
        Ok(png)
    }
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new(1000, 600)
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, chart: &ChartSpec) -> Result<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            return Err(ForecastError::Render(format!(
                "Invalid image size {}x{}",
                self.width, self.height
            )));
        }

        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        self.draw(chart, &mut buffer)?;
        self.encode_png(&buffer)
    }
}

/// Axis ranges covering every point, bar and category label
fn bounds(spec: &ChartSpec) -> (Range<f64>, Range<f64>) {
    let points = spec.series.iter().flat_map(|s| s.points.iter());

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = 0.0f64;
    let mut y_max = f64::NEG_INFINITY;
    for p in points.filter(|p| p.x.is_finite() && p.y.is_finite()) {
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y).min(p.base);
        y_max = y_max.max(p.y).max(p.base);
    }
    if !spec.x_ticks.is_empty() {
        x_min = x_min.min(0.0);
        x_max = x_max.max((spec.x_ticks.len() - 1) as f64);
    }

    let x_range = if x_min.is_finite() && x_max.is_finite() {
        (x_min - 0.5)..(x_max + 0.5)
    } else {
        0.0..1.0
    };
    let y_range = if y_max.is_finite() && y_max > y_min {
        y_min..(y_max + (y_max - y_min) * 0.05)
    } else {
        y_min..(y_min + 1.0)
    };

    (x_range, y_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_forecast::report::{ChartPoint, ChartSeries};

    fn spec(series: Vec<ChartSeries>, ticks: usize) -> ChartSpec {
        ChartSpec {
            key: "week_line_chart".to_string(),
            artifact: "week_line_chart_created_at_repo.png".to_string(),
            title: "Issues".to_string(),
            x_label: "Week Days".to_string(),
            y_label: "Issues".to_string(),
            x_ticks: (0..ticks).map(|i| format!("tick {}", i)).collect(),
            series,
        }
    }

    #[test]
    fn test_bounds_include_ticks_and_bases() {
        let bars = ChartSeries {
            label: "Closed".to_string(),
            kind: SeriesKind::Bar,
            points: vec![ChartPoint { x: 1.0, y: 4.0, base: 2.0 }],
        };
        let (x, y) = bounds(&spec(vec![bars], 7));

        assert_eq!(x, -0.5..6.5);
        assert_eq!(y.start, 0.0);
        assert!(y.end > 4.0);
    }

    #[test]
    fn test_bounds_without_points() {
        let (x, y) = bounds(&spec(Vec::new(), 0));
        assert_eq!(x, 0.0..1.0);
        assert_eq!(y, 0.0..1.0);
    }

    #[test]
    fn test_renders_png_without_font() {
        let series = vec![
            ChartSeries {
                label: "Count".to_string(),
                kind: SeriesKind::Markers,
                points: vec![ChartPoint::new(0.0, 1.0), ChartPoint::new(1.0, 3.0)],
            },
            ChartSeries {
                label: "Predictions".to_string(),
                kind: SeriesKind::Line,
                points: vec![ChartPoint::new(0.0, 2.0), ChartPoint::new(1.0, 2.5)],
            },
        ];
        let renderer = PlottersRenderer::new(160, 120);
        assert!(!renderer.draws_text());

        let png = renderer.render(&spec(series, 2)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_invalid_font_is_rejected() {
        let result = PlottersRenderer::default().with_font(b"not a font".to_vec());
        assert!(matches!(result, Err(ForecastError::Render(msg)) if msg == "Invalid chart font"));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let renderer = PlottersRenderer::new(0, 100);
        assert!(matches!(
            renderer.render(&spec(Vec::new(), 0)),
            Err(ForecastError::Render(_))
        ));
    }
}
