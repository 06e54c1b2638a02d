//! Date handling for the Fineract wire format.
//!
//! Fineract serialises `LocalDate` as `[yyyy, m, d]` and expects incoming
//! dates as strings in the format announced by the `dateFormat` field.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pattern sent as `dateFormat` alongside every dated payload.
pub const DATE_FORMAT: &str = "dd MMMM yyyy";

/// Locale sent as `locale` alongside every dated or numeric payload.
pub const LOCALE: &str = "en";

const CHRONO_FORMAT: &str = "%d %B %Y";

/// Render a date the way [`DATE_FORMAT`] describes it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(CHRONO_FORMAT).to_string()
}

/// Parse an HTML `<input type="date">` value.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// A request body with Fineract's `dateFormat` and `locale` attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Localized<T> {
    #[serde(flatten)]
    pub inner: T,
    pub date_format: &'static str,
    pub locale: &'static str,
}

impl<T> Localized<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            date_format: DATE_FORMAT,
            locale: LOCALE,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireDate {
    Parts(Vec<i64>),
    Text(String),
}

fn from_wire(wire: WireDate) -> Option<NaiveDate> {
    match wire {
        WireDate::Parts(parts) => match parts.as_slice() {
            [y, m, d, ..] => NaiveDate::from_ymd_opt(*y as i32, *m as u32, *d as u32),
            _ => None,
        },
        WireDate::Text(text) => parse_iso_date(&text)
            .or_else(|| NaiveDate::parse_from_str(text.trim(), CHRONO_FORMAT).ok()),
    }
}

/// `#[serde(with = "fineract_date")]` for required dates.
pub mod fineract_date {
    use super::*;

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireDate::deserialize(deserializer)?;
        from_wire(wire).ok_or_else(|| serde::de::Error::custom("unrecognised Fineract date"))
    }
}

/// `#[serde(with = "fineract_date_opt", default)]` for optional dates.
pub mod fineract_date_opt {
    use super::*;

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = Option::<WireDate>::deserialize(deserializer)?;
        Ok(wire.and_then(from_wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Dated {
        #[serde(with = "fineract_date")]
        on: NaiveDate,
        #[serde(with = "fineract_date_opt", default)]
        until: Option<NaiveDate>,
    }

    #[test]
    fn reads_array_dates() {
        let dated: Dated = serde_json::from_value(json!({"on": [2024, 3, 7]})).unwrap();
        assert_eq!(dated.on, NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert_eq!(dated.until, None);
    }

    #[test]
    fn reads_string_dates() {
        let dated: Dated =
            serde_json::from_value(json!({"on": "2024-03-07", "until": "07 March 2025"})).unwrap();
        assert_eq!(dated.until, NaiveDate::from_ymd_opt(2025, 3, 7));
        assert_eq!(dated.on.to_string(), "2024-03-07");
    }

    #[test]
    fn writes_fineract_format() {
        let dated = Dated {
            on: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            until: None,
        };
        let value = serde_json::to_value(&dated).unwrap();
        assert_eq!(value["on"], "05 January 2024");
        assert!(value["until"].is_null());
    }

    #[test]
    fn localized_flattens_payload() {
        let body = Localized::new(serde_json::json!({"name": "x"}));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["name"], "x");
        assert_eq!(value["dateFormat"], DATE_FORMAT);
        assert_eq!(value["locale"], "en");
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_value::<Dated>(json!({"on": [2024]})).is_err());
        assert_eq!(parse_iso_date("31/12/2024"), None);
    }
}
