use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Upstream class record of unknown completeness.
///
/// Every field is optional and lenient: strings also accept JSON numbers,
/// and any other JSON type is read as absent instead of failing the record.
/// `image`, `instructor` and `date` are the store table's column names for
/// `image_url`, `instructor_name` and `class_date`; the latter win when both are set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawClassRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub instructor_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub instructor: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub members: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub class_date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub datetime: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub capacity: Option<u32>,
    #[serde(deserialize_with = "lenient_count")]
    pub enrolled: Option<u32>,
}

impl RawClassRecord {
    /// Non-object values become an all-absent record.
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            serde_json::from_value(value).unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// A class as shown on the page. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassListing {
    pub id: Uuid,
    #[schema(example = "스콘 클래스")]
    pub name: String,
    pub description: String,
    #[schema(example = "/images/placeholder.png")]
    pub image: String,
    #[schema(example = 15000)]
    pub price: f64,
    pub instructor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[schema(example = "2025-06-01T10:00:00.000Z")]
    pub date: String,
    #[schema(example = "2/6")]
    pub members: String,
    pub is_full: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CatalogState {
    Loading,
    Populated,
    Empty,
}

/// Response body of `GET /classes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CatalogView {
    pub state: CatalogState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub classes: Vec<ClassListing>,
}

/// Registration form as posted by the page.
///
/// The phone arrives either as one `phone` field or as the three
/// `phone1`/`phone2`/`phone3` segments of the split input.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub class_id: String,
    pub baking_class: String,
    pub name: String,
    pub phone: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub phone3: Option<String>,
    pub email: Option<String>,
}

/// Custom schedule request form.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleRequestForm {
    pub name: String,
    pub class_type: String,
    pub phone: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub phone3: Option<String>,
}

/// Row written to the `registrations` table. `created_at` is stamped by
/// the store client, never by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub class_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub baking_class: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub name: String,
    pub phone: String,
    pub class_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// Transient notice the page shows after a submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            title: "신청 완료".into(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            title: "신청 실패".into(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// Items offered by the custom schedule form.
pub const CLASS_MENU: &[&str] = &[
    "휘낭시에 3종(초코칩+헤이즐넛/콘푸로스트/콘치즈)",
    "르뱅쿠키(플레인)",
    "스콘 2종(초코칩/옥수수 치즈 택1)",
    "과일케이크1호(망고/블루베리 택1)",
    "마들렌 2종(유자/초코)",
    "바나나푸딩+스노우볼쿠키",
    "베이글2종(플레인 치즈/옥수수 택1)",
    "파운드케이크(유자레몬)",
    "비스코티+사브레",
    "소금빵 2종(모카/갈릭)",
    "쫀득빵 2종(플레인 크림치즈/블루베리 크림치즈)",
    "단과자빵 2종(팥빵/소세지빵)",
    "미니식빵 2종(연유밀크모닝/앙버터 중)",
    "시나몬 트위스트",
    "이 외 품목은 카톡채팅 or 전화로 문의해주세요.",
];

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_raw_record_lenient_fields() {
        let record = RawClassRecord::from_value(json!({
            "name": 42,
            "price": "15000",
            "members": ["not", "a", "string"],
            "capacity": 6,
            "enrolled": "2",
            "unexpected": true
        }));
        assert_eq!(record.name.as_deref(), Some("42"));
        assert_eq!(record.price, Some(15000.0));
        assert_eq!(record.members, None);
        assert_eq!(record.capacity, Some(6));
        assert_eq!(record.enrolled, Some(2));
    }

    #[test]
    fn test_raw_record_from_non_object() {
        assert_eq!(RawClassRecord::from_value(json!(null)), RawClassRecord::default());
        assert_eq!(RawClassRecord::from_value(json!("x")), RawClassRecord::default());
    }

    #[test]
    fn test_registration_form_accepts_camel_case() {
        let form: RegistrationForm = serde_json::from_value(json!({
            "classId": "abc",
            "bakingClass": "Scone Class",
            "name": "김민지",
            "phone1": "010",
            "phone2": "1234",
            "phone3": "5678"
        }))
        .unwrap();
        assert_eq!(form.class_id, "abc");
        assert_eq!(form.baking_class, "Scone Class");
        assert_eq!(form.phone2.as_deref(), Some("1234"));
        assert!(form.email.is_none());
    }
}
