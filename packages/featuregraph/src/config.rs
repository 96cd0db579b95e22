//! Configuration constants, validation functions and runtime settings.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::error::{FeatureError, Result};

/// GML 3.2 namespace.
pub const GML_NS: &str = "http://www.opengis.net/gml/3.2";

/// GML 3.1 namespace, accepted on input.
pub const GML31_NS: &str = "http://www.opengis.net/gml";

/// WFS 2.0 namespace.
pub const WFS_NS: &str = "http://www.opengis.net/wfs/2.0";

/// XLink namespace.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Connect timeout for dereferencing external references.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Read timeout for dereferencing external references.
///
/// A slow target fails after this many seconds instead of hanging the export.
pub const HTTP_READ_TIMEOUT_SECS: u64 = 30;

/// WFS version used in synthesized GetObject URLs.
pub const DEFAULT_WFS_VERSION: &str = "2.0.0";

/// WFS service name used in synthesized GetObject URLs.
pub const DEFAULT_WFS_SERVICE: &str = "WFS";

/// Local names of single geometry elements in the GML namespaces.
pub const GEOMETRY_ELEMENTS: &[&str] = &["Point", "LineString", "Curve", "Polygon", "Surface"];

/// Local names of multi geometry elements in the GML namespaces.
pub const MULTI_GEOMETRY_ELEMENTS: &[&str] = &[
    "MultiPoint",
    "MultiCurve",
    "MultiLineString",
    "MultiSurface",
    "MultiPolygon",
];

/// GML properties carrying structural metadata rather than feature content.
///
/// Skipped by the parser and silently dropped by the validator when the
/// declared type does not mention them.
pub const STRUCTURAL_PROPERTIES: &[&str] = &[
    "boundedBy",
    "name",
    "description",
    "identifier",
    "metaDataProperty",
    "descriptionReference",
];

/// Identifier grammar: no leading digit, no ':' after the first character.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D[^:]*$").expect("valid regex"));

/// Check whether a namespace URI is one of the GML namespaces.
#[must_use]
pub fn is_gml_namespace(namespace: &str) -> bool {
    namespace == GML_NS || namespace == GML31_NS
}

/// Check whether a GML local name denotes a geometry element.
#[must_use]
pub fn is_geometry_element(local_name: &str) -> bool {
    GEOMETRY_ELEMENTS.contains(&local_name) || MULTI_GEOMETRY_ELEMENTS.contains(&local_name)
}

/// Validate a feature id or reference token.
///
/// # Arguments
/// * `id` - The identifier to validate
/// * `element` - Element name reported in the error
///
/// # Examples
/// ```
/// use featuregraph::config::validate_identifier;
///
/// assert!(validate_identifier("road.1", "Road").is_ok());
/// assert!(validate_identifier("1road", "Road").is_err());
/// assert!(validate_identifier("app:road", "Road").is_err());
/// ```
pub fn validate_identifier(id: &str, element: &str) -> Result<()> {
    if IDENTIFIER_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(FeatureError::InvalidIdentifier {
            id: id.to_string(),
            element: element.to_string(),
        })
    }
}

/// Build the "fetch object by id" URL for a feature that is not inlined.
///
/// # Examples
/// ```
/// use featuregraph::config::get_object_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/wfs").unwrap();
/// assert_eq!(
///     get_object_url(&base, "2.0.0", "WFS", "road.1"),
///     "https://example.com/wfs?request=GetObject&version=2.0.0&service=WFS&objectid=road.1"
/// );
/// ```
pub fn get_object_url(base: &Url, version: &str, service: &str, id: &str) -> String {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("request", "GetObject")
        .append_pair("version", version)
        .append_pair("service", service)
        .append_pair("objectid", id);
    url.to_string()
}

/// Runtime settings for the exporter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// How many levels of nested features are inlined; `None` is unbounded.
    pub resolve_depth: Option<u32>,
    /// Base URL for GetObject references to features that are not inlined.
    pub object_base_url: Option<Url>,
    /// WFS version placed in GetObject URLs.
    pub wfs_version: String,
    /// WFS service name placed in GetObject URLs.
    pub wfs_service: String,
    /// Whether external references within the depth budget are fetched.
    pub dereference_external: bool,
    /// Connect timeout for external references.
    pub http_connect_timeout_secs: u64,
    /// Read timeout for external references.
    pub http_timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            resolve_depth: None,
            object_base_url: None,
            wfs_version: DEFAULT_WFS_VERSION.to_string(),
            wfs_service: DEFAULT_WFS_SERVICE.to_string(),
            dereference_external: true,
            http_connect_timeout_secs: HTTP_CONNECT_TIMEOUT_SECS,
            http_timeout_secs: HTTP_READ_TIMEOUT_SECS,
        }
    }
}

impl ExportConfig {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// Reads `FEATUREGRAPH_RESOLVE_DEPTH`, `FEATUREGRAPH_OBJECT_BASE_URL`,
    /// `FEATUREGRAPH_WFS_VERSION`, `FEATUREGRAPH_WFS_SERVICE`,
    /// `FEATUREGRAPH_DEREFERENCE` and `FEATUREGRAPH_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let resolve_depth = std::env::var("FEATUREGRAPH_RESOLVE_DEPTH")
            .ok()
            .filter(|v| v != "*")
            .map(|v| {
                v.parse::<u32>().map_err(|_| {
                    FeatureError::Config(format!("FEATUREGRAPH_RESOLVE_DEPTH is not a number: {v}"))
                })
            })
            .transpose()?;

        let object_base_url = std::env::var("FEATUREGRAPH_OBJECT_BASE_URL")
            .ok()
            .map(|v| Url::parse(&v))
            .transpose()?;

        let wfs_version =
            std::env::var("FEATUREGRAPH_WFS_VERSION").unwrap_or(defaults.wfs_version);

        let wfs_service =
            std::env::var("FEATUREGRAPH_WFS_SERVICE").unwrap_or(defaults.wfs_service);

        let dereference_external = std::env::var("FEATUREGRAPH_DEREFERENCE")
            .ok()
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults.dereference_external);

        let http_timeout_secs = std::env::var("FEATUREGRAPH_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.http_timeout_secs);

        Ok(Self {
            resolve_depth,
            object_base_url,
            wfs_version,
            wfs_service,
            dereference_external,
            http_connect_timeout_secs: defaults.http_connect_timeout_secs,
            http_timeout_secs,
        })
    }

    /// Parse settings from a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load settings from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Set the resolve depth.
    #[must_use]
    pub fn with_resolve_depth(mut self, depth: Option<u32>) -> Self {
        self.resolve_depth = depth;
        self
    }

    /// Set the GetObject base URL.
    #[must_use]
    pub fn with_object_base_url(mut self, url: Url) -> Self {
        self.object_base_url = Some(url);
        self
    }

    /// Enable or disable fetching of external references.
    #[must_use]
    pub fn with_dereference_external(mut self, enabled: bool) -> Self {
        self.dereference_external = enabled;
        self
    }

    /// Set the read timeout for external references.
    #[must_use]
    pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("road1", "Road").is_ok());
        assert!(validate_identifier("_x", "Road").is_ok());
        assert!(validate_identifier("Road.12-a", "Road").is_ok());
    }

    #[test]
    fn test_validate_identifier_invalid() {
        assert!(validate_identifier("", "Road").is_err());
        assert!(validate_identifier("1road", "Road").is_err());
        assert!(validate_identifier("road:1", "Road").is_err());
    }

    #[test]
    fn test_get_object_url_keeps_existing_query() {
        let base = Url::parse("https://example.com/ows?map=roads").unwrap();
        assert_eq!(
            get_object_url(&base, "2.0.0", "WFS", "r1"),
            "https://example.com/ows?map=roads&request=GetObject&version=2.0.0&service=WFS&objectid=r1"
        );
    }

    #[test]
    fn test_geometry_element_names() {
        assert!(is_geometry_element("Point"));
        assert!(is_geometry_element("MultiSurface"));
        assert!(!is_geometry_element("Road"));
    }

    #[test]
    fn test_export_config_from_yaml() {
        let config = ExportConfig::from_yaml_str(
            "resolve_depth: 2\nobject_base_url: https://example.com/wfs\n",
        )
        .unwrap();
        assert_eq!(config.resolve_depth, Some(2));
        assert_eq!(
            config.object_base_url.as_ref().map(Url::as_str),
            Some("https://example.com/wfs")
        );
        assert_eq!(config.wfs_version, DEFAULT_WFS_VERSION);
        assert!(config.dereference_external);
    }

    #[test]
    fn test_export_config_rejects_unknown_keys() {
        assert!(ExportConfig::from_yaml_str("depth: 2\n").is_err());
    }
}
