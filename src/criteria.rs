//! Search criteria, one variant per catalogue search strategy.
use crate::error::{Error, Result};
use crate::settings::Settings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_CLOUD_COVER: u8 = 100;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    #[serde(rename = "SENTINEL-2")]
    Sentinel2,
    #[serde(rename = "SENTINEL-3")]
    Sentinel3,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Sentinel2, Platform::Sentinel3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentinel2 => "SENTINEL-2",
            Self::Sentinel3 => "SENTINEL-3",
        }
    }

    /// Product types the catalogue serves for this platform.
    pub fn product_types(&self) -> &'static [&'static str] {
        match self {
            Self::Sentinel2 => &["S2MSI1C", "S2MSI2A"],
            Self::Sentinel3 => &["OL_1_EFR___", "OL_1_ERR___", "OL_2_LFR___", "OL_2_WFR___"],
        }
    }

    pub fn supports(&self, product_type: &str) -> bool {
        self.product_types().contains(&product_type)
    }

    /// Only Sentinel-2 products carry a `cloudCover` attribute in the catalogue.
    pub fn filters_cloud_cover(&self) -> bool {
        matches!(self, Self::Sentinel2)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                Error::invalid(
                    "platform",
                    format!("{s} is not a valid platform, use SENTINEL-2 or SENTINEL-3"),
                )
            })
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    #[serde(rename = "W")]
    pub west: f64,
    #[serde(rename = "S")]
    pub south: f64,
    #[serde(rename = "E")]
    pub east: f64,
    #[serde(rename = "N")]
    pub north: f64,
}

/// Area of interest. In configuration files a point is written `[lat, lon]`
/// and a bounding box as a `{ W, S, E, N }` table.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(from = "RegionRepr", into = "RegionRepr")]
pub enum Region {
    Point { lat: f64, lon: f64 },
    BoundingBox(BoundingBox),
}

#[derive(Deserialize, Serialize, Clone, Copy)]
#[serde(untagged)]
enum RegionRepr {
    Point([f64; 2]),
    BoundingBox(BoundingBox),
}

impl From<RegionRepr> for Region {
    fn from(repr: RegionRepr) -> Self {
        match repr {
            RegionRepr::Point([lat, lon]) => Region::Point { lat, lon },
            RegionRepr::BoundingBox(bbox) => Region::BoundingBox(bbox),
        }
    }
}

impl From<Region> for RegionRepr {
    fn from(region: Region) -> Self {
        match region {
            Region::Point { lat, lon } => RegionRepr::Point([lat, lon]),
            Region::BoundingBox(bbox) => RegionRepr::BoundingBox(bbox),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParametricQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub region: Region,
    pub platform: Platform,
    pub product_type: String,
    pub max_cloud_cover: u8,
}

impl ParametricQuery {
    fn from_settings(settings: &Settings) -> Result<Self> {
        let mut missing = vec![];
        if settings.start_date.is_none() {
            missing.push("start_date");
        }
        if settings.end_date.is_none() {
            missing.push("end_date");
        }
        if settings.roi_lat_lon.is_none() {
            missing.push("roi_lat_lon");
        }
        if settings.platform.is_none() {
            missing.push("platform");
        }
        if settings.product_type.as_deref().map_or(true, str::is_empty) {
            missing.push("product_type");
        }

        match (
            settings.start_date,
            settings.end_date,
            settings.roi_lat_lon,
            settings.platform,
            settings.product_type.clone(),
        ) {
            (Some(start_date), Some(end_date), Some(region), Some(platform), Some(product_type))
                if missing.is_empty() =>
            {
                if !platform.supports(&product_type) {
                    return Err(Error::invalid(
                        "product_type",
                        format!("{product_type} is not a valid product type for {platform}"),
                    ));
                }
                Ok(Self {
                    start_date,
                    end_date,
                    region,
                    platform,
                    product_type,
                    max_cloud_cover: settings.cloud.unwrap_or(DEFAULT_MAX_CLOUD_COVER),
                })
            }
            _ => Err(Error::MissingParameters(missing)),
        }
    }
}

/// Exactly one strategy is active per search: a single product name wins over
/// a list of names, which wins over the spatio-temporal parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchCriteria {
    ByName(String),
    ByList(Vec<String>),
    ByParameters(ParametricQuery),
}

impl SearchCriteria {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if let Some(tile) = settings.tile.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Self::ByName(tile.clone()));
        }
        if let Some(tiles) = settings.tiles_list.as_ref().filter(|l| !l.is_empty()) {
            return Ok(Self::ByList(tiles.clone()));
        }
        ParametricQuery::from_settings(settings).map(Self::ByParameters)
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::ByName(_) => "name",
            Self::ByList(_) => "list",
            Self::ByParameters(_) => "parameters",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parametric_settings() -> Settings {
        Settings {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            roi_lat_lon: Some(Region::Point { lat: 40.0, lon: -3.0 }),
            platform: Some(Platform::Sentinel2),
            product_type: Some("S2MSI2A".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_tile_takes_precedence() {
        let settings = Settings {
            tile: Some("T1".to_string()),
            tiles_list: Some(vec!["A".to_string()]),
            ..parametric_settings()
        };
        assert_eq!(
            SearchCriteria::from_settings(&settings).unwrap(),
            SearchCriteria::ByName("T1".to_string())
        );
    }

    #[test]
    fn test_list_over_parameters() {
        let settings = Settings {
            tile: Some(String::new()),
            tiles_list: Some(vec!["A".to_string(), "B".to_string()]),
            ..parametric_settings()
        };
        let criteria = SearchCriteria::from_settings(&settings).unwrap();
        assert_eq!(criteria.strategy(), "list");
    }

    #[test]
    fn test_parametric_defaults_cloud_cover() {
        match SearchCriteria::from_settings(&parametric_settings()).unwrap() {
            SearchCriteria::ByParameters(q) => assert_eq!(q.max_cloud_cover, 100),
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn test_missing_parameters_are_named() {
        let settings = Settings {
            platform: None,
            roi_lat_lon: None,
            ..parametric_settings()
        };
        match SearchCriteria::from_settings(&settings) {
            Err(Error::MissingParameters(missing)) => {
                assert_eq!(missing, vec!["roi_lat_lon", "platform"])
            }
            other => panic!("expected MissingParameters, got {other:?}"),
        }
    }

    #[test]
    fn test_product_type_must_match_platform() {
        let settings = Settings {
            platform: Some(Platform::Sentinel3),
            ..parametric_settings()
        };
        assert!(matches!(
            SearchCriteria::from_settings(&settings),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_region_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            roi: Region,
        }
        let point: Wrapper = toml::from_str("roi = [43.4, -3.8]").unwrap();
        assert_eq!(point.roi, Region::Point { lat: 43.4, lon: -3.8 });

        let bbox: Wrapper =
            toml::from_str("roi = { N = 43.5, S = 43.3, E = -3.7, W = -4 }").unwrap();
        assert_eq!(
            bbox.roi,
            Region::BoundingBox(BoundingBox {
                west: -4.0,
                south: 43.3,
                east: -3.7,
                north: 43.5
            })
        );
    }
}
