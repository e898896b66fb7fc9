use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Account record persisted in the `account` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Domain record owned by exactly one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub account_id: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Domain {
    /// Returns `true` when the record belongs to the provided account.
    pub fn is_owned_by(&self, account_id: &str) -> bool {
        self.account_id == account_id
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

/// Accepts identifiers sent either as JSON strings or as bare numbers.
///
/// Older clients post `account_id` as a number; the value is kept as an
/// opaque string either way. `null` becomes an empty string so validation
/// reports the field as blank.
pub(crate) fn deserialize_opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawId>::deserialize(deserializer)? {
        None => String::new(),
        Some(RawId::Text(value)) => value,
        Some(RawId::Signed(value)) => value.to_string(),
        Some(RawId::Unsigned(value)) => value.to_string(),
        Some(RawId::Float(value)) => value.to_string(),
    })
}
