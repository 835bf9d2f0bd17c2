//! Analytics dashboard: a two-row metric grid from the Umami stats API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use serde::Deserialize;

use super::{
    DisplayHints, HINT_FIELDS, ImagePayload, ParamField, ParamKind, RenderOutcome, RenderResult,
    View, ViewError, encode_png, format_count, format_duration, parse_params,
};
use crate::canvas::{self, Canvas};
use crate::font::{FontQuery, FontService};

const SCHEMA: [ParamField; 9] = [
    ParamField { name: "umami_host", kind: ParamKind::String, required: true },
    ParamField { name: "umami_website_id", kind: ParamKind::String, required: true },
    ParamField { name: "umami_api_key", kind: ParamKind::String, required: true },
    ParamField { name: "umami_time_range", kind: ParamKind::String, required: false },
    ParamField { name: "title", kind: ParamKind::String, required: false },
    HINT_FIELDS[0],
    HINT_FIELDS[1],
    HINT_FIELDS[2],
    HINT_FIELDS[3],
];

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const ROW1_Y: i32 = 32;
const ROW2_Y: i32 = 90;

fn default_time_range() -> String {
    "24h".to_owned()
}

#[derive(Debug, Deserialize)]
struct UmamiParams {
    umami_host: String,
    umami_website_id: String,
    umami_api_key: String,
    #[serde(default = "default_time_range")]
    umami_time_range: String,
    title: Option<String>,
    #[serde(flatten)]
    hints: DisplayHints,
}

/// One metric as the stats endpoint reports it: current window value plus
/// the previous window's for trend computation.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct Metric {
    #[serde(default)]
    value: u64,
    #[serde(default)]
    prev: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct Stats {
    #[serde(default)]
    pageviews: Metric,
    #[serde(default)]
    visitors: Metric,
    #[serde(default)]
    visits: Metric,
    #[serde(default)]
    bounces: Metric,
    #[serde(default)]
    totaltime: Metric,
}

/// Parse `Nh`/`Nd`/`Nw` into a lookback delta. Anything unparseable falls
/// back to 24 hours rather than erroring.
fn parse_time_range(range: &str) -> TimeDelta {
    let fallback = TimeDelta::hours(24);
    let Some((idx, unit)) = range.char_indices().last() else {
        return fallback;
    };
    let Ok(n) = range[..idx].parse::<i64>() else {
        return fallback;
    };
    match unit {
        'h' => TimeDelta::hours(n),
        'd' => TimeDelta::days(n),
        'w' => TimeDelta::weeks(n),
        _ => fallback,
    }
}

/// Percent change plus trend arrow. A cold start (prev 0) with any traffic
/// reads as "100%" up; two zeroes show no arrow at all.
fn percent_change(current: u64, previous: u64) -> (String, Option<char>) {
    if previous == 0 {
        return if current > 0 { ("100%".to_owned(), Some('▲')) } else { ("0%".to_owned(), None) };
    }
    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    if change > 0.0 {
        (format!("{change:.0}%"), Some('▲'))
    } else if change < 0.0 {
        (format!("{:.0}%", change.abs()), Some('▼'))
    } else {
        ("0%".to_owned(), None)
    }
}

fn change_text(current: u64, previous: u64) -> String {
    let (pct, arrow) = percent_change(current, previous);
    match arrow {
        Some(arrow) => format!("{arrow}{pct}"),
        None => pct,
    }
}

pub struct UmamiStatsView {
    fonts: Arc<FontService>,
}

impl UmamiStatsView {
    pub fn new(fonts: Arc<FontService>) -> Self {
        Self { fonts }
    }

    fn fetch(&self, params: &UmamiParams) -> Result<Stats, String> {
        let now = Local::now();
        let start = now - parse_time_range(&params.umami_time_range);
        let url = format!(
            "{}/api/websites/{}/stats",
            params.umami_host.trim_end_matches('/'),
            params.umami_website_id
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| err.to_string())?;
        let response = client
            .get(&url)
            .bearer_auth(&params.umami_api_key)
            .query(&[
                ("startAt", start.timestamp_millis().to_string()),
                ("endAt", now.timestamp_millis().to_string()),
            ])
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| err.to_string())?;
        response.json::<Stats>().map_err(|err| err.to_string())
    }

    fn render(&self, stats: &Stats, time_range: &str, title: Option<&str>) -> Result<Vec<u8>, ViewError> {
        let mut canvas = Canvas::new();

        let title_font = self.fonts.resolve(&FontQuery::sized(18));
        let label_font = self.fonts.resolve(&FontQuery::sized(14));
        let value_font = self.fonts.resolve(&FontQuery::sized(20));
        let change_font = self.fonts.resolve(&FontQuery::sized(12));

        let title_text = format!("{} ({time_range})", title.unwrap_or("Umami Stats"));
        canvas.draw_text_centered(&title_font, 8, &title_text);

        // Top row: pageviews and visitors over two columns.
        let col2 = canvas::WIDTH / 2;
        let top = [
            ("PV", format_count(stats.pageviews.value), change_text(stats.pageviews.value, stats.pageviews.prev)),
            ("UV", format_count(stats.visitors.value), change_text(stats.visitors.value, stats.visitors.prev)),
        ];
        for (i, (label, value, change)) in top.iter().enumerate() {
            let x = i as i32 * col2 as i32;
            canvas.draw_text_centered_in(&label_font, x, col2, ROW1_Y, label);
            canvas.draw_text_centered_in(&value_font, x, col2, ROW1_Y + 18, value);
            canvas.draw_text_centered_in(&change_font, x, col2, ROW1_Y + 42, change);
        }

        // Bottom row: visits, bounces, total time over three columns.
        let col3 = canvas::WIDTH / 3;
        let bottom = [
            ("Visits", format_count(stats.visits.value), change_text(stats.visits.value, stats.visits.prev)),
            ("Bounces", format_count(stats.bounces.value), change_text(stats.bounces.value, stats.bounces.prev)),
            ("Time", format_duration(stats.totaltime.value), change_text(stats.totaltime.value, stats.totaltime.prev)),
        ];
        for (i, (label, value, change)) in bottom.iter().enumerate() {
            let x = i as i32 * col3 as i32;
            canvas.draw_text_centered_in(&label_font, x, col3, ROW2_Y, label);
            canvas.draw_text_centered_in(&value_font, x, col3, ROW2_Y + 16, value);
            canvas.draw_text_centered_in(&change_font, x, col3, ROW2_Y + 38, change);
        }

        encode_png(&canvas)
    }
}

impl View for UmamiStatsView {
    fn schema(&self) -> &'static [ParamField] {
        &SCHEMA
    }

    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
        let params: UmamiParams = parse_params("umami_stats", params)?;

        let (stats, degraded) = match self.fetch(&params) {
            Ok(stats) => (stats, None),
            Err(reason) => {
                log::warn!("umami_stats: fetch failed, rendering zeroed data: {reason}");
                (Stats::default(), Some(reason))
            }
        };

        let png = self.render(&stats, &params.umami_time_range, params.title.as_deref())?;
        let result = RenderResult::Image(ImagePayload { png, hints: params.hints });
        Ok(match degraded {
            Some(reason) => RenderOutcome::degraded(result, reason),
            None => RenderOutcome::ok(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cold_start_with_traffic_is_full_growth() {
        assert_eq!(percent_change(50, 0), ("100%".to_owned(), Some('▲')));
    }

    #[test]
    fn two_zeroes_show_no_arrow() {
        assert_eq!(percent_change(0, 0), ("0%".to_owned(), None));
    }

    #[test]
    fn decline_is_absolute_with_down_arrow() {
        assert_eq!(percent_change(80, 100), ("20%".to_owned(), Some('▼')));
    }

    #[test]
    fn growth_is_signed_up() {
        assert_eq!(percent_change(150, 100), ("50%".to_owned(), Some('▲')));
        assert_eq!(percent_change(100, 100), ("0%".to_owned(), None));
    }

    #[test]
    fn time_ranges_parse_with_default() {
        assert_eq!(parse_time_range("7d"), TimeDelta::days(7));
        assert_eq!(parse_time_range("36h"), TimeDelta::hours(36));
        assert_eq!(parse_time_range("2w"), TimeDelta::weeks(2));
        assert_eq!(parse_time_range("bogus"), TimeDelta::hours(24));
        assert_eq!(parse_time_range(""), TimeDelta::hours(24));
        assert_eq!(parse_time_range("七d"), TimeDelta::hours(24));
    }

    #[test]
    fn unreachable_host_degrades_to_zeroed_card() {
        let view = UmamiStatsView::new(Arc::new(FontService::with_search_paths(
            PathBuf::from("/nonexistent"),
            Vec::new(),
        )));
        let outcome = view
            .execute(serde_json::json!({
                "umami_host": "http://127.0.0.1:1",
                "umami_website_id": "site",
                "umami_api_key": "key",
            }))
            .unwrap();
        assert!(outcome.degraded.is_some());
        let png = outcome.result.png().unwrap().to_vec();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (canvas::WIDTH, canvas::HEIGHT));
    }

    #[test]
    fn zeroed_stats_render() {
        let view = UmamiStatsView::new(Arc::new(FontService::with_search_paths(
            PathBuf::from("/nonexistent"),
            Vec::new(),
        )));
        let png = view.render(&Stats::default(), "24h", None).unwrap();
        assert!(image::load_from_memory(&png).is_ok());
    }
}
