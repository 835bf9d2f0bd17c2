//! Off-work countdown card.

use chrono::{Local, NaiveTime, Timelike};
use serde::Deserialize;

use super::{
    ParamField, ParamKind, RenderOutcome, RenderResult, TextPayload, View, ViewError,
    parse_params, signature_now,
};

const SCHEMA: [ParamField; 2] = [
    ParamField { name: "clock_in", kind: ParamKind::String, required: true },
    ParamField { name: "clock_out", kind: ParamKind::String, required: true },
];

const TITLE: &str = "还有多久下班";

#[derive(Debug, Deserialize)]
struct WorkParams {
    clock_in: String,
    clock_out: String,
}

/// Countdown message for the given working hours at the given local time.
/// Malformed times yield an error message rather than a failure; the card
/// is still rendered.
fn work_status(clock_in: &str, clock_out: &str, now: NaiveTime) -> String {
    let parsed_in = NaiveTime::parse_from_str(clock_in, "%H:%M");
    let parsed_out = NaiveTime::parse_from_str(clock_out, "%H:%M");
    let (Ok(clock_in), Ok(clock_out)) = (parsed_in, parsed_out) else {
        return "时间格式错误".to_owned();
    };

    if now < clock_in || now >= clock_out {
        return "已经下班啦".to_owned();
    }

    let now_minutes = now.hour() * 60 + now.minute();
    let out_minutes = clock_out.hour() * 60 + clock_out.minute();
    let remaining = out_minutes - now_minutes;
    let (hours, minutes) = (remaining / 60, remaining % 60);
    if hours > 0 {
        format!("距下班 {hours} 小时 {minutes} 分钟")
    } else {
        format!("距下班 {minutes} 分钟")
    }
}

pub struct WorkView;

impl View for WorkView {
    fn schema(&self) -> &'static [ParamField] {
        &SCHEMA
    }

    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
        let params: WorkParams = parse_params("work", params)?;
        let message = work_status(&params.clock_in, &params.clock_out, Local::now().time());
        Ok(RenderOutcome::ok(RenderResult::Text(TextPayload {
            title: Some(TITLE.to_owned()),
            message,
            signature: Some(signature_now()),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn counts_down_hours_and_minutes() {
        assert_eq!(work_status("09:00", "18:00", at(15, 30)), "距下班 2 小时 30 分钟");
    }

    #[test]
    fn minutes_only_within_last_hour() {
        assert_eq!(work_status("09:00", "18:00", at(17, 15)), "距下班 45 分钟");
    }

    #[test]
    fn off_work_outside_hours() {
        assert_eq!(work_status("09:00", "18:00", at(8, 59)), "已经下班啦");
        assert_eq!(work_status("09:00", "18:00", at(18, 0)), "已经下班啦");
        assert_eq!(work_status("09:00", "18:00", at(23, 0)), "已经下班啦");
    }

    #[test]
    fn malformed_time_reports_format_error() {
        assert_eq!(work_status("9am", "18:00", at(12, 0)), "时间格式错误");
        assert_eq!(work_status("09:00", "25:99", at(12, 0)), "时间格式错误");
    }

    #[test]
    fn execute_produces_titled_text() {
        let outcome = WorkView
            .execute(serde_json::json!({"clock_in": "09:00", "clock_out": "18:00"}))
            .unwrap();
        match outcome.result {
            RenderResult::Text(payload) => {
                assert_eq!(payload.title.as_deref(), Some(TITLE));
                assert!(!payload.message.is_empty());
            }
            RenderResult::Image(_) => panic!("expected text"),
        }
    }
}
