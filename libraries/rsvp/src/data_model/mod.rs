//! # Data model
//! An RSVP is one guest's latest answer. Guests fill in a form, the form is turned into an
//! [`RsvpRecord`], and the record is addressed by an identity key derived from its contact fields
//! (see [`key`]).
//!
//! Field names on the wire and on disk are the raw form field names (`name`, `phone`, `email`,
//! `count`, `attend`), so a snapshot written by this crate can be read by anything that understands
//! the form, and vice versa.

pub mod key;

/// Raw field values as supplied by the presentation layer on submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RsvpForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub count: String,
    #[serde(default)]
    pub attend: String,
}

impl RsvpForm {
    /// Trim every field. Whitespace-only input counts as not supplied.
    pub fn normalized(self) -> Self {
        let trim = |s: String| s.trim().to_string();
        Self {
            name: trim(self.name),
            phone: trim(self.phone),
            email: trim(self.email),
            count: trim(self.count),
            attend: trim(self.attend),
        }
    }
}

/// One guest's latest submission.
///
/// The identity key is not part of the serialized body: on disk it is the key of the snapshot
/// mapping, and the aggregator only ever receives the form fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RsvpRecord {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "blank_field")]
    pub phone: Option<String>,
    #[serde(default, with = "blank_field")]
    pub email: Option<String>,
    #[serde(rename = "count", default, with = "blank_field")]
    pub party_size: Option<String>,
    #[serde(rename = "attend", default)]
    pub attendance: Attendance,
}

impl RsvpRecord {
    /// Build a record from a form. The key is left empty until resolution assigns it.
    pub fn from_form(form: RsvpForm) -> Self {
        let RsvpForm {
            name,
            phone,
            email,
            count,
            attend,
        } = form.normalized();
        let non_empty = |s: String| (!s.is_empty()).then_some(s);

        Self {
            key: String::new(),
            name,
            phone: non_empty(phone),
            email: non_empty(email),
            party_size: non_empty(count),
            attendance: Attendance::from(attend),
        }
    }

    pub fn with_key(self, key: String) -> Self {
        Self { key, ..self }
    }
}

/// Optional form fields travel as strings, with a missing value written as `""` like a blank input.
mod blank_field {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.trim().is_empty()))
    }
}

/// Declared attendance intent.
///
/// Anything other than `yes`, `no` or `maybe` is read as [`Attendance::Unset`], which shares the
/// `maybe` outcome message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Attendance {
    Yes,
    No,
    Maybe,
    #[default]
    Unset,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Yes => "yes",
            Attendance::No => "no",
            Attendance::Maybe => "maybe",
            Attendance::Unset => "",
        }
    }
}

impl From<String> for Attendance {
    fn from(value: String) -> Self {
        Attendance::from(value.as_str())
    }
}

impl From<&str> for Attendance {
    fn from(value: &str) -> Self {
        match value.trim() {
            "yes" => Attendance::Yes,
            "no" => Attendance::No,
            "maybe" => Attendance::Maybe,
            "" => Attendance::Unset,
            other => {
                log::debug!("Unrecognized attendance value `{other}`, treating as unset");
                Attendance::Unset
            }
        }
    }
}

impl From<Attendance> for &'static str {
    fn from(value: Attendance) -> Self {
        value.as_str()
    }
}

impl std::fmt::Display for Attendance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attendance::Unset => f.write_str("unset"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_map_to_record() {
        let record = RsvpRecord::from_form(RsvpForm {
            name: "  Asha ".to_string(),
            phone: "   ".to_string(),
            email: "asha@example.com".to_string(),
            count: "2".to_string(),
            attend: "yes".to_string(),
        });

        assert_eq!(record.name, "Asha");
        assert_eq!(record.phone, None);
        assert_eq!(record.email.as_deref(), Some("asha@example.com"));
        assert_eq!(record.party_size.as_deref(), Some("2"));
        assert_eq!(record.attendance, Attendance::Yes);
        assert!(record.key.is_empty());
    }

    #[test]
    fn record_serializes_with_form_field_names() {
        let record = RsvpRecord {
            key: "9999999999".to_string(),
            name: "Asha".to_string(),
            phone: Some("9999999999".to_string()),
            email: None,
            party_size: Some("3".to_string()),
            attendance: Attendance::Maybe,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Asha",
                "phone": "9999999999",
                "email": "",
                "count": "3",
                "attend": "maybe",
            })
        );
    }

    #[test]
    fn blank_fields_read_back_as_missing() {
        let record: RsvpRecord = serde_json::from_str(
            r#"{"name": "Ravi", "phone": "", "email": null, "count": " ", "attend": "no"}"#,
        )
        .unwrap();
        assert_eq!(record.phone, None);
        assert_eq!(record.email, None);
        assert_eq!(record.party_size, None);
        assert_eq!(record.attendance, Attendance::No);
    }

    #[test]
    fn unknown_attendance_reads_as_unset() {
        let record: RsvpRecord =
            serde_json::from_str(r#"{"name": "Ravi", "attend": "definitely"}"#).unwrap();
        assert_eq!(record.attendance, Attendance::Unset);

        let record: RsvpRecord = serde_json::from_str(r#"{"name": "Ravi"}"#).unwrap();
        assert_eq!(record.attendance, Attendance::Unset);
        assert_eq!(serde_json::to_value(record.attendance).unwrap(), "");
    }
}
