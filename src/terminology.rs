// MIT License

use tracing::debug;

use crate::constants::{
    MARKER_AREA_NAMES_PREFIX, MARKER_ARRAY_SUFFIX, MARKER_ZONE_NAMES_PREFIX,
};
use crate::error::{ParadoxError, Result};
use crate::scrape::{extract_between, split_quoted_list};

/// Cached human-readable name tables scraped from the module's landing page.
///
/// The area table is parsed eagerly: declaration order assigns each area its
/// zero-based index, which is what the arm request and the status arrays key
/// on. The zone table stays a raw delimited string because its entries can
/// only be interpreted together with the numeric status codes fetched from a
/// different page (see [`StatusSnapshot::scrape`](crate::status::StatusSnapshot::scrape)).
///
/// Loading is all-or-nothing: a missing marker leaves the cache empty.
/// The cache lives for one login cycle and is cleared on logout or failure.
#[derive(Debug, Default)]
pub struct TerminologyCache {
    area_names: Vec<String>,
    zone_table: Option<String>,
}

impl TerminologyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the name tables for this session are already cached.
    pub fn is_loaded(&self) -> bool {
        !self.area_names.is_empty()
    }

    /// Populate the cache from a landing page body.
    ///
    /// Fails with `TerminologyUnavailable` when either name table is missing
    /// or the area table is empty; no partial state survives a failure.
    pub fn load_from_body(&mut self, body: &str) -> Result<()> {
        let areas_str = extract_between(body, MARKER_AREA_NAMES_PREFIX, MARKER_ARRAY_SUFFIX)
            .ok_or_else(|| ParadoxError::TerminologyUnavailable {
                details: "area name table not found".to_string(),
            })?;

        let area_names = split_quoted_list(areas_str);
        if area_names.is_empty() || area_names.iter().all(|n| n.is_empty()) {
            return Err(ParadoxError::TerminologyUnavailable {
                details: "area name table is empty".to_string(),
            });
        }

        let zone_table = extract_between(body, MARKER_ZONE_NAMES_PREFIX, MARKER_ARRAY_SUFFIX)
            .ok_or_else(|| ParadoxError::TerminologyUnavailable {
                details: "zone name table not found".to_string(),
            })?;

        debug!(
            "Terminology loaded: {} areas, {} zone table bytes",
            area_names.len(),
            zone_table.len()
        );
        self.area_names = area_names;
        self.zone_table = Some(zone_table.to_string());
        Ok(())
    }

    /// Zero-based declared index of an area, matched case-insensitively.
    pub fn area_index(&self, name: &str) -> Option<usize> {
        self.area_names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Area name at a zero-based declared index.
    pub fn area_name(&self, index: usize) -> Option<&str> {
        self.area_names.get(index).map(String::as_str)
    }

    pub fn area_count(&self) -> usize {
        self.area_names.len()
    }

    /// The raw `(area_index, zone_name)` pair table, as scraped.
    pub fn zone_table(&self) -> Option<&str> {
        self.zone_table.as_deref()
    }

    /// Drop all cached names. Called at logout and on any session failure.
    pub fn clear(&mut self) {
        self.area_names.clear();
        self.zone_table = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDING_PAGE: &str = concat!(
        "<html><script>\n",
        "tbl_areanam = new Array(\"House\",\"Garage\");\n",
        "tbl_zone = new Array(\"1\",\"Front door\",\"1\",\"Hallway\",\"2\",\"Garage door\");\n",
        "</script></html>"
    );

    #[test]
    fn test_load_from_body() {
        let mut cache = TerminologyCache::new();
        cache.load_from_body(LANDING_PAGE).unwrap();

        assert!(cache.is_loaded());
        assert_eq!(cache.area_count(), 2);
        assert_eq!(cache.area_name(0), Some("House"));
        assert_eq!(cache.area_name(1), Some("Garage"));
        assert!(cache.zone_table().unwrap().contains("Front door"));
    }

    #[test]
    fn test_area_index_case_insensitive() {
        let mut cache = TerminologyCache::new();
        cache.load_from_body(LANDING_PAGE).unwrap();

        assert_eq!(cache.area_index("house"), Some(0));
        assert_eq!(cache.area_index("GARAGE"), Some(1));
        assert_eq!(cache.area_index("Cellar"), None);
    }

    #[test]
    fn test_missing_area_table_fails() {
        let mut cache = TerminologyCache::new();
        let err = cache
            .load_from_body("tbl_zone = new Array(\"1\",\"Door\");")
            .unwrap_err();
        assert!(matches!(err, ParadoxError::TerminologyUnavailable { .. }));
        assert!(!cache.is_loaded());
    }

    #[test]
    fn test_missing_zone_table_discards_areas() {
        // All-or-nothing: the parsed area names must not survive a zone
        // table failure.
        let mut cache = TerminologyCache::new();
        let err = cache
            .load_from_body("tbl_areanam = new Array(\"House\");")
            .unwrap_err();
        assert!(matches!(err, ParadoxError::TerminologyUnavailable { .. }));
        assert!(!cache.is_loaded());
        assert_eq!(cache.area_count(), 0);
    }

    #[test]
    fn test_empty_area_table_fails() {
        let mut cache = TerminologyCache::new();
        let err = cache
            .load_from_body("tbl_areanam = new Array();\ntbl_zone = new Array(\"1\",\"D\");")
            .unwrap_err();
        assert!(matches!(err, ParadoxError::TerminologyUnavailable { .. }));
    }

    #[test]
    fn test_clear() {
        let mut cache = TerminologyCache::new();
        cache.load_from_body(LANDING_PAGE).unwrap();
        cache.clear();
        assert!(!cache.is_loaded());
        assert!(cache.zone_table().is_none());
    }
}
