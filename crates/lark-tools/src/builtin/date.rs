//! `current_date`: today's date in the local time zone.

use crate::descriptor::ToolDescriptor;
use crate::error::ToolError;
use chrono::{Duration, Local, NaiveDate};
use schemars::JsonSchema;
use serde::Deserialize;

pub const NAME: &str = "current_date";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DateParams {
    /// Days to add to today; negative values go back. Default: 0.
    #[serde(default)]
    pub offset_days: i64,
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::typed(
        NAME,
        "Get the current (today's) date as YYYY-MM-DD, optionally shifted by a number of days.",
        |params: DateParams| async move {
            format_date(Local::now().date_naive(), params.offset_days)
        },
    )
}

fn format_date(today: NaiveDate, offset_days: i64) -> Result<String, ToolError> {
    Duration::try_days(offset_days)
        .and_then(|offset| today.checked_add_signed(offset))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| {
            ToolError::InvalidParameters(format!("offset_days {offset_days} is out of range"))
        })
}
