//! Mapping of upstream class records into [`ClassListing`]s.
//!
//! Everything here is pure apart from id generation and the "now" fallback
//! for a missing class date.

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ClassListing, RawClassRecord};

pub const NAME_PLACEHOLDER: &str = "제목 없음";
pub const DESCRIPTION_PLACEHOLDER: &str = "설명 없음";
pub const IMAGE_PLACEHOLDER: &str = "/images/placeholder.png";
pub const INSTRUCTOR_PLACEHOLDER: &str = "강사 미정";

static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/+").expect("regex compiles"));

#[derive(Debug, Error)]
#[error("payload is neither a JSON array nor newline-delimited JSON: {0}")]
pub struct MalformedPayload(pub String);

/// Collapse every run of `/` into a single separator: `"3///6"` -> `"3/6"`.
pub fn collapse_separators(members: &str) -> String {
    SEPARATOR_RUN.replace_all(members, "/").into_owned()
}

/// First two parts of `members` split on separator runs; missing parts are `""`.
pub fn split_members(members: &str) -> (&str, &str) {
    let mut parts = SEPARATOR_RUN.split(members);
    let enrolled = parts.next().unwrap_or("");
    let capacity = parts.next().unwrap_or("");
    (enrolled, capacity)
}

/// Full only when both parts are the same string and that string is non-empty.
///
/// This is string equality on purpose: `"03/3"` is not full.
pub fn is_full(members: &str) -> bool {
    let (enrolled, capacity) = split_members(members);
    !enrolled.is_empty() && enrolled == capacity
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn normalize_record(record: RawClassRecord) -> ClassListing {
    let members = record.members.unwrap_or_default();
    let is_full = is_full(&members);

    ClassListing {
        id: Uuid::new_v4(),
        name: present(record.name)
            .or_else(|| present(record.title))
            .unwrap_or_else(|| NAME_PLACEHOLDER.to_string()),
        description: present(record.description)
            .unwrap_or_else(|| DESCRIPTION_PLACEHOLDER.to_string()),
        image: present(record.image_url)
            .or_else(|| present(record.image))
            .unwrap_or_else(|| IMAGE_PLACEHOLDER.to_string()),
        price: record
            .price
            .filter(|p| p.is_finite() && *p >= 0.0)
            .unwrap_or(0.0),
        instructor: present(record.instructor_name)
            .or_else(|| present(record.instructor))
            .unwrap_or_else(|| INSTRUCTOR_PLACEHOLDER.to_string()),
        datetime: record.datetime,
        date: present(record.class_date)
            .or_else(|| present(record.date))
            .unwrap_or_else(now_iso8601),
        members: collapse_separators(&members),
        is_full,
        capacity: record.capacity,
        enrolled: record.enrolled,
    }
}

/// Normalize in upstream order. No sorting, filtering, or dedup.
pub fn normalize_all(records: Vec<RawClassRecord>) -> Vec<ClassListing> {
    records.into_iter().map(normalize_record).collect()
}

/// Parse an item body as a JSON array, falling back to newline-delimited JSON.
///
/// The fallback is all-or-nothing: one bad line rejects the whole body.
pub fn parse_records(body: &str) -> Result<Vec<RawClassRecord>, MalformedPayload> {
    if let Ok(values) = serde_json::from_str::<Vec<Value>>(body) {
        return Ok(values.into_iter().map(RawClassRecord::from_value).collect());
    }

    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<Value>(line)
                .map(RawClassRecord::from_value)
                .map_err(|err| MalformedPayload(err.to_string()))
        })
        .collect()
}
