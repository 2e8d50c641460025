// MIT License

//! Normalized status model scraped from the module's live-status page.

use serde::Serialize;
use tracing::debug;

use crate::constants::{
    MARKER_AREA_STATUS_PREFIX, MARKER_ARRAY_SUFFIX, MARKER_ZONE_STATUS_PREFIX,
};
use crate::error::{ParadoxError, Result};
use crate::scrape::{extract_between, nth_token, nth_token_int, token_count};
use crate::terminology::TerminologyCache;

/// Friendly name for an area status code, per the panel firmware's tables.
pub fn area_status_label(status: u8) -> &'static str {
    match status {
        1 => "disarmed",
        2 => "armed",
        3 => "inAlarm",
        4 => "sleep",
        5 => "stay",
        6 => "entryDelay",
        7 => "exitDelay",
        8 => "ready",
        9 => "notReady",
        10 => "instant",
        _ => "unknown",
    }
}

/// Friendly name for a zone status code.
pub fn zone_status_label(status: u8) -> &'static str {
    match status {
        0 => "closed",
        1 => "opened",
        _ => "unknown",
    }
}

/// Status of a single zone, nested under its owning area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneStatus {
    pub name: String,
    /// 1-based zone id: the zone's ordinal position in the module's table.
    pub id: u32,
    pub status: u8,
    #[serde(rename = "statusName")]
    pub status_name: &'static str,
}

/// Status of one area with its zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaStatus {
    pub name: String,
    /// 1-based area id as used by the module's status arrays.
    pub id: u32,
    pub status: u8,
    #[serde(rename = "statusName")]
    pub status_name: &'static str,
    #[serde(rename = "zonesInfo")]
    pub zones: Vec<ZoneStatus>,
}

/// One complete scrape of the live-status page.
///
/// Produced atomically: a snapshot either reflects one fully parsed
/// response or it does not exist. Areas appear in first-encountered order
/// of the zone-table walk; zones in walk order.
///
/// Serializes to the downstream compatibility shape:
///
/// ```json
/// { "status": { "areasStatus": [
///   { "name": "...", "id": 1, "status": 2, "statusName": "armed",
///     "zonesInfo": [ { "name": "...", "id": 1, "status": 0, "statusName": "closed" } ] }
/// ] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub areas: Vec<AreaStatus>,
}

impl Serialize for StatusSnapshot {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct Root<'a> {
            status: Body<'a>,
        }
        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(rename = "areasStatus")]
            areas_status: &'a [AreaStatus],
        }
        Root {
            status: Body {
                areas_status: &self.areas,
            },
        }
        .serialize(serializer)
    }
}

impl StatusSnapshot {
    /// Parse a live-status page body into a snapshot.
    ///
    /// The cached zone table is walked in `(area_index, zone_name)` pairs.
    /// An `area_index` of literal `"0"` marks an unused zone slot and is
    /// skipped. The zone's 1-based id is its ordinal pair position; the
    /// area's status code is read at `area_index - 1` of the area-status
    /// array and the zone's at `zone_id - 1` of the zone-status array.
    /// That index arithmetic matches the module's own JavaScript and is
    /// kept verbatim.
    ///
    /// Missing markers fail with `MalformedResponse`; retrying is the
    /// caller's decision.
    pub fn scrape(body: &str, terminology: &TerminologyCache) -> Result<Self> {
        let area_status_str =
            extract_between(body, MARKER_AREA_STATUS_PREFIX, MARKER_ARRAY_SUFFIX).ok_or_else(
                || ParadoxError::MalformedResponse {
                    details: "area status table not found".to_string(),
                },
            )?;
        let zone_status_str =
            extract_between(body, MARKER_ZONE_STATUS_PREFIX, MARKER_ARRAY_SUFFIX).ok_or_else(
                || ParadoxError::MalformedResponse {
                    details: "zone status table not found".to_string(),
                },
            )?;
        let zone_table =
            terminology
                .zone_table()
                .ok_or_else(|| ParadoxError::TerminologyUnavailable {
                    details: "zone table not cached".to_string(),
                })?;

        let mut areas: Vec<AreaStatus> = Vec::new();
        let pair_tokens = token_count(zone_table);

        for idx in (0..pair_tokens).step_by(2) {
            let Some(area_index_str) = nth_token(zone_table, idx) else {
                break;
            };
            if area_index_str == "0" {
                // Unused zone slot
                continue;
            }
            let area_index = match area_index_str.parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    debug!("Skipping zone pair with bad area index: {area_index_str:?}");
                    continue;
                }
            };
            let zone_name = nth_token(zone_table, idx + 1).unwrap_or_default();
            let zone_id = idx / 2 + 1;

            let pos = match areas.iter().position(|a| a.id == area_index as u32) {
                Some(pos) => pos,
                None => {
                    let status =
                        nth_token_int(area_status_str, area_index - 1).unwrap_or(0) as u8;
                    areas.push(AreaStatus {
                        name: terminology
                            .area_name(area_index - 1)
                            .unwrap_or_default()
                            .to_string(),
                        id: area_index as u32,
                        status,
                        status_name: area_status_label(status),
                        zones: Vec::new(),
                    });
                    areas.len() - 1
                }
            };

            let zone_status = nth_token_int(zone_status_str, zone_id - 1).unwrap_or(0) as u8;
            areas[pos].zones.push(ZoneStatus {
                name: zone_name,
                id: zone_id as u32,
                status: zone_status,
                status_name: zone_status_label(zone_status),
            });
        }

        debug!(
            "Status scraped: {} areas, {} zones",
            areas.len(),
            areas.iter().map(|a| a.zones.len()).sum::<usize>()
        );
        Ok(StatusSnapshot { areas })
    }
}
