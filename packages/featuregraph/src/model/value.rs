//! Property values.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::FeatureHandle;
use crate::error::{FeatureError, Result};
use crate::geometry::Geometry;
use crate::schema::{QName, ScalarKind};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Typed primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Any(String),
}

impl ScalarValue {
    /// Convert element text into a value of `kind`.
    ///
    /// # Examples
    /// ```
    /// use featuregraph::model::ScalarValue;
    /// use featuregraph::schema::{QName, ScalarKind};
    ///
    /// let lanes = QName::new("http://example.com/app", "lanes");
    /// assert_eq!(
    ///     ScalarValue::parse("4", ScalarKind::Integer, &lanes).unwrap(),
    ///     ScalarValue::Integer(4)
    /// );
    /// assert!(ScalarValue::parse("four", ScalarKind::Integer, &lanes).is_err());
    /// ```
    pub fn parse(text: &str, kind: ScalarKind, property: &QName) -> Result<Self> {
        let conversion_error = || FeatureError::Conversion {
            value: text.to_string(),
            property: property.to_string(),
            kind: kind.to_string(),
        };
        let trimmed = text.trim();

        match kind {
            ScalarKind::String => Ok(Self::String(text.to_string())),
            ScalarKind::Any => Ok(Self::Any(text.to_string())),
            ScalarKind::Integer => trimmed
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| conversion_error()),
            ScalarKind::Float => trimmed
                .parse::<f64>()
                .map(Self::Float)
                .map_err(|_| conversion_error()),
            ScalarKind::Boolean => match trimmed {
                "true" | "1" => Ok(Self::Boolean(true)),
                "false" | "0" => Ok(Self::Boolean(false)),
                _ => Err(conversion_error()),
            },
            ScalarKind::Date => {
                let date = trimmed.strip_suffix('Z').unwrap_or(trimmed);
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .map(Self::Date)
                    .map_err(|_| conversion_error())
            }
            ScalarKind::DateTime => DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.naive_utc())
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT))
                .map(Self::DateTime)
                .map_err(|_| conversion_error()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::String(_) => ScalarKind::String,
            Self::Integer(_) => ScalarKind::Integer,
            Self::Float(_) => ScalarKind::Float,
            Self::Boolean(_) => ScalarKind::Boolean,
            Self::Date(_) => ScalarKind::Date,
            Self::DateTime(_) => ScalarKind::DateTime,
            Self::Any(_) => ScalarKind::Any,
        }
    }
}

/// Canonical text form, the inverse of [`ScalarValue::parse`].
impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Any(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
        }
    }
}

/// Value held by a feature property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Primitive(ScalarValue),
    Geometry(Geometry),
    /// Nested or referenced feature in the same graph.
    Feature(FeatureHandle),
    /// Same-document reference awaiting resolution, holding the target id.
    Unresolved(String),
    /// Reference to a feature outside the document, holding the absolute URL.
    External(String),
}

impl PropertyValue {
    /// Short description of the value kind for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive(v) => v.kind().to_string(),
            Self::Geometry(g) => format!("geometry {}", g.type_name()),
            Self::Feature(_) => "feature".to_string(),
            Self::Unresolved(id) => format!("unresolved reference '#{id}'"),
            Self::External(url) => format!("external reference '{url}'"),
        }
    }

    #[must_use]
    pub fn as_feature(&self) -> Option<FeatureHandle> {
        match self {
            Self::Feature(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Whether the value can contribute to a feature envelope.
    #[must_use]
    pub fn affects_bounds(&self) -> bool {
        matches!(self, Self::Geometry(_) | Self::Feature(_))
    }
}
