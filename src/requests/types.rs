use std::str::FromStr;

use serde::Deserialize;

use crate::error::{RaghuError, Result};

const MAX_FIELD_LEN: usize = 2000;

/// One submitted support ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmingRequest {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub location: String,
    pub soil_type: String,
    pub crop: String,
    pub issue_type: String,
    pub description: String,
    pub language: Language,
    pub rating: Option<Rating>,
    /// First successful advice for this request, when answer caching is on.
    pub answer: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Form fields as posted by the submission page.  Every field is optional
/// on the wire; [`NewRequest::validate`] decides what is acceptable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRequest {
    pub name: String,
    pub phone: String,
    pub location: String,
    pub soil_type: String,
    pub crop: String,
    pub issue_type: String,
    pub description: String,
    pub language: String,
}

impl NewRequest {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("location", &self.location),
            ("soilType", &self.soil_type),
            ("crop", &self.crop),
            ("issueType", &self.issue_type),
            ("description", &self.description),
            ("language", &self.language),
        ];
        for (field, value) in fields {
            if value.chars().count() > MAX_FIELD_LEN {
                return Err(RaghuError::Validation(format!(
                    "{field} must be at most {MAX_FIELD_LEN} characters"
                )));
            }
        }

        for (field, value) in [
            ("name", &self.name),
            ("crop", &self.crop),
            ("issueType", &self.issue_type),
        ] {
            if value.trim().is_empty() {
                return Err(RaghuError::Validation(format!("{field} is required")));
            }
        }

        let phone_ok = self
            .phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
        if !phone_ok {
            return Err(RaghuError::Validation(
                "phone may only contain digits, spaces and + - ( )".into(),
            ));
        }

        Ok(())
    }
}

// -- Language ----------------------------------------------------------------

/// Reply language chosen on the form.  Only the exact value `hindi` selects
/// Hindi; any other non-empty value is kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Other(String),
}

impl Language {
    pub fn parse(s: &str) -> Self {
        match s {
            "" | "english" => Self::English,
            "hindi" => Self::Hindi,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::English => "english",
            Self::Hindi => "hindi",
            Self::Other(s) => s.as_str(),
        }
    }
}

// -- Rating ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Poor,
    Bad,
    Ok,
    Good,
    Excellent,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Bad => "bad",
            Self::Ok => "ok",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

impl FromStr for Rating {
    type Err = RaghuError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "poor" => Ok(Self::Poor),
            "bad" => Ok(Self::Bad),
            "ok" => Ok(Self::Ok),
            "good" => Ok(Self::Good),
            "excellent" => Ok(Self::Excellent),
            other => Err(RaghuError::Validation(format!(
                "rating must be one of poor, bad, ok, good, excellent (got {other:?})"
            ))),
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> NewRequest {
        NewRequest {
            name: "Ravi".into(),
            crop: "wheat".into(),
            issue_type: "yellow leaves".into(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_request_is_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let req = NewRequest {
            crop: "   ".into(),
            ..valid()
        };
        let err = req.validate().unwrap_err();
        assert!(matches!(err, RaghuError::Validation(ref m) if m.contains("crop")));
    }

    #[test]
    fn phone_with_letters_is_rejected() {
        let req = NewRequest {
            phone: "98x76".into(),
            ..valid()
        };
        assert!(req.validate().is_err());

        let req = NewRequest {
            phone: "+91 (98765) 43210".into(),
            ..valid()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn overlong_field_is_rejected() {
        let req = NewRequest {
            description: "a".repeat(MAX_FIELD_LEN + 1),
            ..valid()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn form_fields_use_camel_case() {
        let req: NewRequest =
            serde_json::from_str(r#"{"soilType":"loam","issueType":"pests"}"#).unwrap();
        assert_eq!(req.soil_type, "loam");
        assert_eq!(req.issue_type, "pests");
        assert!(req.name.is_empty());
    }

    #[test]
    fn language_parse_is_case_sensitive() {
        assert_eq!(Language::parse("hindi"), Language::Hindi);
        assert_eq!(Language::parse("Hindi"), Language::Other("Hindi".into()));
        assert_eq!(Language::parse(""), Language::English);
        assert_eq!(Language::parse("marathi").as_str(), "marathi");
    }

    #[test]
    fn rating_parses_only_known_values() {
        assert_eq!("excellent".parse::<Rating>().unwrap(), Rating::Excellent);
        assert_eq!("ok".parse::<Rating>().unwrap().to_string(), "ok");
        assert!("Good".parse::<Rating>().is_err());
        assert!("amazing".parse::<Rating>().is_err());
    }
}
