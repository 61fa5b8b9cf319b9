//! Kaplan-Meier survival curves stratified by model predictions
//!
//! Consumes a persisted regressor artifact: every subject gets a predicted
//! outcome from the scaled whole-feature matrix, subjects are stratified
//! into predicted-survival and predicted-death groups, and a product-limit
//! survival curve per group is rendered as an SVG step plot.

use crate::data::{column_to_array1, Column, MlData};
use crate::error::{HeartPredictError, Result};
use crate::training::load_regressor;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// One survival curve: drop points (time, survival probability), starting
/// implicitly at (0, 1).
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalCurve {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Product-limit (Kaplan-Meier) estimate over event times.
///
/// `events[i]` is true when subject `i` experienced the event at
/// `times[i]`, false when the observation is censored.
pub fn kaplan_meier(times: &[f64], events: &[bool]) -> Result<Vec<(f64, f64)>> {
    if times.len() != events.len() {
        return Err(HeartPredictError::ShapeError {
            expected: format!("events length = {}", times.len()),
            actual: format!("events length = {}", events.len()),
        });
    }

    let mut event_times: Vec<f64> = times
        .iter()
        .zip(events.iter())
        .filter_map(|(&t, &e)| if e { Some(t) } else { None })
        .collect();
    event_times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    event_times.dedup();

    let mut survival_prob = 1.0;
    let mut curve = Vec::with_capacity(event_times.len());

    for &event_time in &event_times {
        let at_risk = times.iter().filter(|&&t| t >= event_time).count();
        let events_count = times
            .iter()
            .zip(events.iter())
            .filter(|&(&t, &e)| t == event_time && e)
            .count();

        if at_risk > 0 {
            survival_prob *= 1.0 - (events_count as f64 / at_risk as f64);
            curve.push((event_time, survival_prob));
        }
    }

    Ok(curve)
}

/// Renders survival curves for one prepared dataset.
pub struct SurvivalBackend {
    data: Arc<MlData>,
}

impl SurvivalBackend {
    /// Create a backend over the prepared dataset.
    pub fn new(data: Arc<MlData>) -> Self {
        Self { data }
    }

    /// Stratify all subjects by the regressor's predicted outcome and write
    /// a Kaplan-Meier comparison plot to `output`. Returns the plot path.
    pub fn create_kaplan_meier_plot_for(
        &self,
        regressor: &Path,
        output: &Path,
    ) -> Result<PathBuf> {
        let model = load_regressor(regressor)?;
        let predictions = model.predict(&self.data.scaled_x)?;

        let times = column_to_array1(self.data.project().df(), Column::Time)?;
        let observed: Vec<bool> = self.data.dataset.y.iter().map(|&v| v >= 0.5).collect();

        let mut curves = Vec::new();
        for (label, predicted_death) in [("predicted survival", false), ("predicted death", true)] {
            let indices: Vec<usize> = predictions
                .iter()
                .enumerate()
                .filter(|(_, &p)| (p >= 0.5) == predicted_death)
                .map(|(i, _)| i)
                .collect();
            if indices.is_empty() {
                continue;
            }

            let group_times: Vec<f64> = indices.iter().map(|&i| times[i]).collect();
            let group_events: Vec<bool> = indices.iter().map(|&i| observed[i]).collect();
            curves.push(SurvivalCurve {
                label: label.to_string(),
                points: kaplan_meier(&group_times, &group_events)?,
            });
        }

        if curves.is_empty() {
            return Err(HeartPredictError::ValidationError(
                "no subjects to stratify".to_string(),
            ));
        }

        let max_time = times.iter().cloned().fold(0.0f64, f64::max);
        let svg = render_step_plot(&curves, max_time);

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, svg)?;
        info!(
            plot = %output.display(),
            groups = curves.len(),
            "rendered Kaplan-Meier plot"
        );
        Ok(output.to_path_buf())
    }
}

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

const CURVE_COLORS: [&str; 2] = ["#2e7dd1", "#d1492e"];

/// Minimal SVG step plot; no plotting dependency needed for two curves and
/// a pair of axes.
fn render_step_plot(curves: &[SurvivalCurve], max_time: f64) -> String {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let max_time = if max_time > 0.0 { max_time } else { 1.0 };

    let x = |t: f64| MARGIN_LEFT + t / max_time * plot_w;
    let y = |s: f64| MARGIN_TOP + (1.0 - s) * plot_h;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" font-family="sans-serif" font-size="16" text-anchor="middle">Kaplan-Meier survival estimate</text>"#,
        WIDTH / 2.0
    );

    // Axes
    let _ = writeln!(
        svg,
        r#"<line x1="{x0}" y1="{y0}" x2="{x0}" y2="{y1}" stroke="black"/>"#,
        x0 = MARGIN_LEFT,
        y0 = MARGIN_TOP,
        y1 = MARGIN_TOP + plot_h
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{x0}" y1="{y1}" x2="{x1}" y2="{y1}" stroke="black"/>"#,
        x0 = MARGIN_LEFT,
        x1 = MARGIN_LEFT + plot_w,
        y1 = MARGIN_TOP + plot_h
    );

    // Y ticks at 0, 0.25, .., 1
    for i in 0..=4 {
        let s = i as f64 / 4.0;
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="11" text-anchor="end">{:.2}</text>"#,
            MARGIN_LEFT - 6.0,
            y(s) + 4.0,
            s
        );
    }

    // X ticks at fifths of the observed range
    for i in 0..=5 {
        let t = max_time * i as f64 / 5.0;
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="11" text-anchor="middle">{:.0}</text>"#,
            x(t),
            MARGIN_TOP + plot_h + 16.0,
            t
        );
    }

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" font-family="sans-serif" font-size="12" text-anchor="middle">time (days)</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 12.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{}" font-family="sans-serif" font-size="12" text-anchor="middle" transform="rotate(-90 16 {})">survival probability</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );

    // Step curves
    for (k, curve) in curves.iter().enumerate() {
        let color = CURVE_COLORS[k % CURVE_COLORS.len()];
        let mut path = format!("M {} {}", x(0.0), y(1.0));
        for &(t, s) in &curve.points {
            let _ = write!(path, " H {} V {}", x(t), y(s));
        }
        let _ = write!(path, " H {}", x(max_time));
        let _ = writeln!(
            svg,
            r#"<path d="{path}" fill="none" stroke="{color}" stroke-width="2"/>"#
        );

        // Legend entry
        let ly = MARGIN_TOP + 14.0 + 18.0 * k as f64;
        let _ = writeln!(
            svg,
            r#"<line x1="{lx}" y1="{ly}" x2="{lx2}" y2="{ly}" stroke="{color}" stroke-width="2"/>"#,
            lx = MARGIN_LEFT + 12.0,
            lx2 = MARGIN_LEFT + 36.0,
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="11">{}</text>"#,
            MARGIN_LEFT + 42.0,
            ly + 4.0,
            curve.label
        );
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kaplan_meier_hand_computed() {
        let times = [1.0, 2.0, 3.0, 4.0, 5.0];
        let events = [true, false, true, true, false];
        let curve = kaplan_meier(&times, &events).unwrap();

        assert_eq!(curve.len(), 3);
        assert_relative_eq!(curve[0].1, 0.8, epsilon = 1e-12);
        assert_relative_eq!(curve[1].1, 0.8 * (2.0 / 3.0), epsilon = 1e-12);
        assert_relative_eq!(curve[2].1, 0.8 * (2.0 / 3.0) * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_kaplan_meier_all_censored_stays_flat() {
        let times = [1.0, 2.0, 3.0];
        let events = [false, false, false];
        let curve = kaplan_meier(&times, &events).unwrap();
        assert!(curve.is_empty());
    }

    #[test]
    fn test_kaplan_meier_is_monotone_decreasing() {
        let times = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let events = [true, true, false, true, true, false, true, true];
        let curve = kaplan_meier(&times, &events).unwrap();
        for pair in curve.windows(2) {
            assert!(pair[1].1 <= pair[0].1);
            assert!(pair[1].0 > pair[0].0);
        }
    }

    #[test]
    fn test_kaplan_meier_rejects_length_mismatch() {
        assert!(kaplan_meier(&[1.0, 2.0], &[true]).is_err());
    }

    #[test]
    fn test_render_step_plot_structure() {
        let curves = vec![
            SurvivalCurve {
                label: "predicted survival".to_string(),
                points: vec![(1.0, 0.9), (2.0, 0.8)],
            },
            SurvivalCurve {
                label: "predicted death".to_string(),
                points: vec![(1.0, 0.5)],
            },
        ];
        let svg = render_step_plot(&curves, 2.0);

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("predicted survival"));
        assert!(svg.contains("Kaplan-Meier"));
    }
}
