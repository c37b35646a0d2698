use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{Registration, RegistrationForm, ScheduleRequest, ScheduleRequestForm};

pub const NAME_MIN_CHARS: usize = 2;
/// Max digits of the area / prefix / line inputs.
pub const PHONE_SEGMENT_MAX: [usize; 3] = [3, 4, 4];

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("regex compiles"));

/// Per-field messages, keyed by the form field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    fn add(&mut self, field: &'static str, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().copied().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn check_name(name: &str, errors: &mut ValidationErrors) -> String {
    let name = name.trim();
    if name.chars().count() < NAME_MIN_CHARS {
        errors.add("name", "이름은 2자 이상이어야 합니다");
    }
    name.to_string()
}

/// Assemble the phone from the single field, or from the three segments.
fn check_phone(
    phone: Option<&str>,
    segments: [Option<&str>; 3],
    min_digits: usize,
    errors: &mut ValidationErrors,
) -> String {
    const MESSAGE: &str = "전화번호를 정확히 입력해주세요";

    let single = phone.map(digits).filter(|p| !p.is_empty());
    let assembled = match single {
        Some(phone) => phone,
        None => {
            let mut assembled = String::new();
            for (segment, max) in segments.iter().zip(PHONE_SEGMENT_MAX) {
                let segment = digits(segment.unwrap_or(""));
                if segment.len() > max {
                    errors.add("phone", MESSAGE);
                }
                assembled.push_str(&segment);
            }
            assembled
        }
    };

    if assembled.len() < min_digits {
        errors.add("phone", MESSAGE);
    }
    assembled
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn validate_registration(
    form: &RegistrationForm,
    min_phone_digits: usize,
) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let class_id = form.class_id.trim().to_string();
    if class_id.is_empty() {
        errors.add("classId", "클래스를 선택해 주세요");
    }
    let name = check_name(&form.name, &mut errors);
    let phone = check_phone(
        form.phone.as_deref(),
        [
            form.phone1.as_deref(),
            form.phone2.as_deref(),
            form.phone3.as_deref(),
        ],
        min_phone_digits,
        &mut errors,
    );
    let email = form
        .email
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if !email.is_empty() && !is_valid_email(&email) {
        errors.add("email", "올바른 이메일 주소를 입력해주세요");
    }

    errors.into_result(Registration {
        class_id,
        name,
        email,
        phone,
        baking_class: form.baking_class.trim().to_string(),
    })
}

pub fn validate_schedule_request(
    form: &ScheduleRequestForm,
    min_phone_digits: usize,
) -> Result<ScheduleRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = check_name(&form.name, &mut errors);
    let class_type = form.class_type.trim().to_string();
    if class_type.is_empty() {
        errors.add("classType", "품목을 선택해 주세요.");
    }
    let phone = check_phone(
        form.phone.as_deref(),
        [
            form.phone1.as_deref(),
            form.phone2.as_deref(),
            form.phone3.as_deref(),
        ],
        min_phone_digits,
        &mut errors,
    );

    errors.into_result(ScheduleRequest {
        name,
        phone,
        class_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str) -> RegistrationForm {
        RegistrationForm {
            class_id: "class-1".into(),
            baking_class: "Scone Class".into(),
            name: name.into(),
            phone1: Some("010".into()),
            phone2: Some("1234".into()),
            phone3: Some("5678".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_registration_ok() {
        let registration = validate_registration(&form("김민지"), 10).unwrap();
        assert_eq!(registration.phone, "01012345678");
        assert_eq!(registration.name, "김민지");
        assert_eq!(registration.email, "");
        assert_eq!(registration.baking_class, "Scone Class");
    }

    #[test]
    fn test_name_too_short() {
        let errors = validate_registration(&form("김"), 10).unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(validate_registration(&form("  a  "), 10).is_err());
        assert!(validate_registration(&form("이수"), 10).is_ok());
    }

    #[test]
    fn test_single_phone_field_strips_non_digits() {
        let mut f = form("Kim");
        f.phone = Some("010-9876-5432".into());
        let registration = validate_registration(&f, 10).unwrap();
        assert_eq!(registration.phone, "01098765432");
    }

    #[test]
    fn test_phone_too_short() {
        let mut f = form("Kim");
        f.phone3 = Some("5".into());
        let errors = validate_registration(&f, 10).unwrap_err();
        assert!(errors.get("phone").is_some());
    }

    #[test]
    fn test_phone_segment_too_long() {
        let mut f = form("Kim");
        f.phone2 = Some("12345".into());
        assert!(validate_registration(&f, 10).is_err());
    }

    #[test]
    fn test_email_optional_but_checked() {
        let mut f = form("Kim");
        f.email = Some(String::new());
        assert!(validate_registration(&f, 10).is_ok());
        f.email = Some("kim@bakery.kr".into());
        assert_eq!(validate_registration(&f, 10).unwrap().email, "kim@bakery.kr");
        f.email = Some("kim@bakery".into());
        assert!(validate_registration(&f, 10).unwrap_err().get("email").is_some());
        f.email = Some("not an email".into());
        assert!(validate_registration(&f, 10).is_err());
    }

    #[test]
    fn test_missing_class_id() {
        let mut f = form("Kim");
        f.class_id = " ".into();
        assert!(validate_registration(&f, 10).unwrap_err().get("classId").is_some());
    }

    #[test]
    fn test_schedule_request_requires_class_type() {
        let f = ScheduleRequestForm {
            name: "Kim".into(),
            class_type: String::new(),
            phone: Some("01012345678".into()),
            ..Default::default()
        };
        let errors = validate_schedule_request(&f, 10).unwrap_err();
        assert!(errors.get("classType").is_some());
        assert!(errors.get("name").is_none());
    }
}
