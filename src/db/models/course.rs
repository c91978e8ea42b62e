use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub duration_hours: i32,
    pub price: Decimal,
    pub max_capacity: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin form payload, used for both create and full update.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CourseInput {
    #[validate(length(min = 1, message = "course name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "duration must not be negative"))]
    pub duration_hours: i32,
    pub price: Decimal,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub max_capacity: i32,
    #[serde(default = "default_active", deserialize_with = "checkbox")]
    pub active: bool,
}

pub(crate) fn default_active() -> bool {
    true
}

/// Accepts HTML checkbox values (`on`) as well as plain booleans.
pub(crate) fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Flag(flag) => Ok(flag),
        Raw::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "1" | "yes" => Ok(true),
            "off" | "false" | "0" | "no" | "" => Ok(false),
            _ => Err(de::Error::invalid_value(
                de::Unexpected::Str(&text),
                &"a checkbox value",
            )),
        },
    }
}
