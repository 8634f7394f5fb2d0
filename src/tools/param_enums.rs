use schemars::JsonSchema;
use serde::de;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the values endpoint renders cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueRenderOption {
    /// Values as displayed in the UI, e.g. `$1.23`.
    #[default]
    FormattedValue,
    /// Raw values, e.g. `1.23`.
    UnformattedValue,
    /// Formulas instead of their results.
    Formula,
}

impl ValueRenderOption {
    pub const VARIANTS: &'static [&'static str] =
        &["FORMATTED_VALUE", "UNFORMATTED_VALUE", "FORMULA"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FormattedValue => "FORMATTED_VALUE",
            Self::UnformattedValue => "UNFORMATTED_VALUE",
            Self::Formula => "FORMULA",
        }
    }
}

impl fmt::Display for ValueRenderOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ValueRenderOption {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.trim().to_ascii_uppercase().as_str() {
            "FORMATTED_VALUE" => Ok(Self::FormattedValue),
            "UNFORMATTED_VALUE" => Ok(Self::UnformattedValue),
            "FORMULA" => Ok(Self::Formula),
            _ => Err(de::Error::unknown_variant(&s, Self::VARIANTS)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    ModifiedTime,
    CreatedTime,
}

impl SortField {
    pub const VARIANTS: &'static [&'static str] = &["name", "modifiedTime", "createdTime"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ModifiedTime => "modifiedTime",
            Self::CreatedTime => "createdTime",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "modifiedtime" | "modified_time" => Some(Self::ModifiedTime),
            "createdtime" | "created_time" => Some(Self::CreatedTime),
            _ => None,
        }
    }
}

/// A Drive `orderBy` clause: comma-separated keys, each optionally `desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy(Vec<(SortField, bool)>);

impl OrderBy {
    /// Parse and canonicalize. The error is a human-readable reason.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut keys = Vec::new();
        for clause in raw.split(',') {
            let mut words = clause.split_whitespace();
            let Some(field) = words.next() else {
                return Err("order_by contains an empty sort key".to_string());
            };
            let field = SortField::parse(field).ok_or_else(|| {
                format!(
                    "unknown sort key '{field}'; expected one of: {}",
                    SortField::VARIANTS.join(", ")
                )
            })?;
            let descending = match words.next() {
                None => false,
                Some(dir) if dir.eq_ignore_ascii_case("desc") => true,
                Some(dir) if dir.eq_ignore_ascii_case("asc") => false,
                Some(dir) => return Err(format!("unknown sort direction '{dir}'")),
            };
            if let Some(extra) = words.next() {
                return Err(format!("unexpected '{extra}' in order_by"));
            }
            keys.push((field, descending));
        }
        Ok(Self(keys))
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, descending)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(field.as_str())?;
            if *descending {
                f.write_str(" desc")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_option_is_case_insensitive() {
        let parsed: ValueRenderOption = serde_json::from_str("\"formula\"").unwrap();
        assert_eq!(parsed, ValueRenderOption::Formula);
        let parsed: ValueRenderOption = serde_json::from_str("\"Unformatted_Value\"").unwrap();
        assert_eq!(parsed, ValueRenderOption::UnformattedValue);

        let err = serde_json::from_str::<ValueRenderOption>("\"RAW\"").unwrap_err();
        assert!(err.to_string().contains("FORMATTED_VALUE"));
    }

    #[test]
    fn order_by_is_canonicalized() {
        let order = OrderBy::parse("modifiedtime DESC, name").unwrap();
        assert_eq!(order.to_string(), "modifiedTime desc,name");
        assert_eq!(
            OrderBy::parse("modifiedTime desc").unwrap().to_string(),
            "modifiedTime desc"
        );
    }

    #[test]
    fn order_by_rejects_unknown_keys() {
        assert!(OrderBy::parse("size").unwrap_err().contains("unknown sort key"));
        assert!(OrderBy::parse("name sideways").is_err());
        assert!(OrderBy::parse("name,").is_err());
    }
}
