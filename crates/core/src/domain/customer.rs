use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Normalizes a caller-supplied identifier. Anything that is not a UUID
    /// yields `None`; callers treat that the same as an unknown record.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(|id| Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored customer record as it travels over the wire.
///
/// Field names follow the browser client's contract (`_id`, camelCase) and
/// every timestamp is rendered as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: CustomerId,
    pub name: String,
    #[serde(with = "wire_timestamp")]
    pub date_of_birth: DateTime<Utc>,
    pub member_number: i64,
    pub interests: String,
    #[serde(with = "wire_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "wire_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Builds a fresh record with a new identifier; both timestamps are `now`.
    pub fn create(fields: CustomerFields, now: DateTime<Utc>) -> Self {
        Self {
            id: CustomerId::generate(),
            name: fields.name,
            date_of_birth: fields.date_of_birth,
            member_number: fields.member_number,
            interests: fields.interests,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn fields(&self) -> CustomerFields {
        CustomerFields {
            name: self.name.clone(),
            date_of_birth: self.date_of_birth,
            member_number: self.member_number,
            interests: self.interests.clone(),
        }
    }

    /// Replaces the four editable fields and stamps `updated_at`.
    pub fn apply(&mut self, fields: CustomerFields, updated_at: DateTime<Utc>) {
        self.name = fields.name;
        self.date_of_birth = fields.date_of_birth;
        self.member_number = fields.member_number;
        self.interests = fields.interests;
        self.updated_at = updated_at;
    }
}

/// The editable part of a record after validation and coercion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerFields {
    pub name: String,
    pub date_of_birth: DateTime<Utc>,
    pub member_number: i64,
    pub interests: String,
}

/// Raw create/update payload. Every key is optional here so that a missing
/// field becomes a validation failure instead of a decode failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub member_number: Option<MemberNumberInput>,
    pub interests: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberNumberInput {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl MemberNumberInput {
    fn is_present(&self) -> bool {
        match self {
            Self::Text(raw) => !raw.trim().is_empty(),
            Self::Integer(_) | Self::Decimal(_) => true,
        }
    }

    pub fn coerce(&self) -> Result<i64, DomainError> {
        let coerced = match self {
            Self::Integer(value) => Some(*value),
            Self::Decimal(value) => {
                let in_range = *value >= i64::MIN as f64 && *value < i64::MAX as f64;
                (value.is_finite() && value.fract() == 0.0 && in_range).then(|| *value as i64)
            }
            Self::Text(raw) => raw.trim().parse::<i64>().ok(),
        };

        coerced.ok_or_else(|| DomainError::InvalidField {
            field: "memberNumber",
            message: "Member number must be a whole number".to_string(),
        })
    }
}

impl From<i64> for MemberNumberInput {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for MemberNumberInput {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for MemberNumberInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MemberNumberInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl CustomerDraft {
    pub fn new(
        name: impl Into<String>,
        date_of_birth: impl Into<String>,
        member_number: impl Into<MemberNumberInput>,
        interests: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            date_of_birth: Some(date_of_birth.into()),
            member_number: Some(member_number.into()),
            interests: Some(interests.into()),
        }
    }

    /// Presence is checked for all four fields before any format rule runs,
    /// so a draft that is both incomplete and malformed reports the former.
    pub fn into_fields(self) -> Result<CustomerFields, DomainError> {
        let (Some(name), Some(date_of_birth), Some(member_number), Some(interests)) = (
            self.name.filter(|value| has_content(value)),
            self.date_of_birth.filter(|value| has_content(value)),
            self.member_number.filter(MemberNumberInput::is_present),
            self.interests.filter(|value| has_content(value)),
        ) else {
            return Err(DomainError::MissingRequiredFields);
        };

        Ok(CustomerFields {
            name,
            date_of_birth: parse_date_of_birth(&date_of_birth)?,
            member_number: member_number.coerce()?,
            interests,
        })
    }
}

fn has_content(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
///
/// The UTC year must fit in four unsigned digits; anything else would be
/// written in a form `parse_timestamp` cannot read back.
pub fn parse_date_of_birth(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    let raw = raw.trim();
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .or_else(|| parse_timestamp(raw))
        .filter(|value| (0..=9999).contains(&value.year()));

    parsed.map(|value| value.trunc_subsecs(3)).ok_or_else(|| DomainError::InvalidField {
        field: "dateOfBirth",
        message: "Date of birth must be an ISO date".to_string(),
    })
}

/// Current time at the precision records are stored with.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok().map(|value| value.with_timezone(&Utc))
}

mod wire_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Timelike, Utc};
    use serde_json::json;

    use super::{parse_date_of_birth, Customer, CustomerDraft, CustomerFields, CustomerId};
    use crate::errors::DomainError;

    #[test]
    fn draft_with_all_fields_coerces_types() {
        let fields = CustomerDraft::new("Ada", "1990-01-01", 42, "math")
            .into_fields()
            .expect("complete draft should validate");

        assert_eq!(fields.name, "Ada");
        assert_eq!(fields.member_number, 42);
        assert_eq!(fields.interests, "math");
        assert_eq!(fields.date_of_birth, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn each_missing_field_reports_all_fields_required() {
        let complete = CustomerDraft::new("Ada", "1990-01-01", 42, "math");
        let variants = [
            CustomerDraft { name: None, ..complete.clone() },
            CustomerDraft { date_of_birth: None, ..complete.clone() },
            CustomerDraft { member_number: None, ..complete.clone() },
            CustomerDraft { interests: None, ..complete.clone() },
            CustomerDraft { name: Some("   ".to_string()), ..complete.clone() },
            CustomerDraft { interests: Some(String::new()), ..complete },
        ];

        for draft in variants {
            assert_eq!(draft.into_fields(), Err(DomainError::MissingRequiredFields));
        }
    }

    #[test]
    fn missing_field_wins_over_malformed_field() {
        let draft = CustomerDraft {
            name: None,
            ..CustomerDraft::new("Ada", "not-a-date", "abc", "math")
        };

        assert_eq!(draft.into_fields(), Err(DomainError::MissingRequiredFields));
    }

    #[test]
    fn member_number_accepts_numeric_strings_and_integral_floats() {
        let from_text: CustomerDraft = serde_json::from_value(json!({
            "name": "Ada",
            "dateOfBirth": "1990-01-01",
            "memberNumber": " 1007 ",
            "interests": "math"
        }))
        .expect("draft should decode");
        assert_eq!(from_text.into_fields().map(|f| f.member_number), Ok(1007));

        let from_float: CustomerDraft = serde_json::from_value(json!({
            "name": "Ada",
            "dateOfBirth": "1990-01-01",
            "memberNumber": 12.0,
            "interests": "math"
        }))
        .expect("draft should decode");
        assert_eq!(from_float.into_fields().map(|f| f.member_number), Ok(12));
    }

    #[test]
    fn member_number_rejects_fractions_and_words() {
        for raw in [json!(4.5), json!("forty-two"), json!("12.5")] {
            let draft: CustomerDraft = serde_json::from_value(json!({
                "name": "Ada",
                "dateOfBirth": "1990-01-01",
                "memberNumber": raw,
                "interests": "math"
            }))
            .expect("draft should decode");

            let error = draft.into_fields().expect_err("member number should be rejected");
            assert!(matches!(error, DomainError::InvalidField { field: "memberNumber", .. }));
        }
    }

    #[test]
    fn null_member_number_counts_as_missing() {
        let draft: CustomerDraft = serde_json::from_value(json!({
            "name": "Ada",
            "dateOfBirth": "1990-01-01",
            "memberNumber": null,
            "interests": "math"
        }))
        .expect("draft should decode");

        assert_eq!(draft.into_fields(), Err(DomainError::MissingRequiredFields));
    }

    #[test]
    fn date_of_birth_accepts_full_timestamps() {
        let parsed = parse_date_of_birth("1985-06-15T08:30:00.123456Z").expect("rfc3339 parses");
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (1985, 6, 15));
        assert_eq!(parsed.hour(), 8);
        assert_eq!(parsed.nanosecond(), 123_000_000);

        assert!(matches!(
            parse_date_of_birth("15/06/1985"),
            Err(DomainError::InvalidField { field: "dateOfBirth", .. })
        ));
    }

    #[test]
    fn date_of_birth_rejects_years_outside_four_digits() {
        for raw in ["+12345-01-01", "-0001-01-01", "9999-12-31T23:00:00-05:00"] {
            assert!(
                matches!(
                    parse_date_of_birth(raw),
                    Err(DomainError::InvalidField { field: "dateOfBirth", .. })
                ),
                "{raw} should be rejected"
            );
        }

        let edge = parse_date_of_birth("9999-12-31T23:59:59.999Z").expect("last storable instant");
        assert_eq!(super::parse_timestamp(&super::format_timestamp(&edge)), Some(edge));
        let first = parse_date_of_birth("0000-01-01").expect("year zero is four digits");
        assert_eq!(super::parse_timestamp(&super::format_timestamp(&first)), Some(first));
    }

    #[test]
    fn zero_member_number_counts_as_present() {
        let draft: CustomerDraft = serde_json::from_value(json!({
            "name": "Ada",
            "dateOfBirth": "1990-01-01",
            "memberNumber": 0,
            "interests": "math"
        }))
        .expect("draft should decode");

        assert_eq!(draft.into_fields().map(|f| f.member_number), Ok(0));
    }

    #[test]
    fn customer_id_parse_normalizes_and_rejects_garbage() {
        let id = CustomerId::generate();
        let upper = id.as_str().to_uppercase();

        assert_eq!(CustomerId::parse(&upper), Some(id));
        assert_eq!(CustomerId::parse("64b7f0c2e4b0a1a2b3c4d5e6"), None);
        assert_eq!(CustomerId::parse(""), None);
    }

    #[test]
    fn customer_serializes_with_client_field_names() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let customer = Customer::create(
            CustomerFields {
                name: "Ada".to_string(),
                date_of_birth: Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
                member_number: 42,
                interests: "math".to_string(),
            },
            now,
        );

        let value = serde_json::to_value(&customer).expect("serialize customer");
        assert_eq!(value["_id"], json!(customer.id.as_str()));
        assert_eq!(value["dateOfBirth"], json!("1990-01-01T00:00:00.000Z"));
        assert_eq!(value["memberNumber"], json!(42));
        assert_eq!(value["createdAt"], value["updatedAt"]);
        assert_eq!(value["createdAt"], json!("2024-03-01T12:00:00.000Z"));

        let decoded: Customer = serde_json::from_value(value).expect("decode customer");
        assert_eq!(decoded, customer);
    }
}
