//! Checks a raw configuration table before any request leaves the machine.
use crate::criteria::{BoundingBox, Platform};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use toml::{Table, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate(config: &Table) -> Result<()> {
    validate_tile(config)?;
    validate_tiles_list(config)?;
    validate_dates(config)?;
    validate_roi(config)?;
    validate_region_name(config)?;
    validate_platform(config)?;
    validate_cloud(config)?;
    Ok(())
}

fn validate_tile(config: &Table) -> Result<()> {
    match config.get("tile") {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(Error::invalid("tile", "must be a string")),
    }
}

fn validate_tiles_list(config: &Table) -> Result<()> {
    match config.get("tiles_list") {
        None => Ok(()),
        Some(Value::Array(tiles)) if tiles.iter().all(Value::is_str) => Ok(()),
        Some(_) => Err(Error::invalid("tiles_list", "must be a list of strings")),
    }
}

/// Dates may be written quoted or as bare TOML dates.
pub(crate) fn date_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Datetime(dt) if dt.time.is_none() && dt.offset.is_none() => Some(dt.to_string()),
        _ => None,
    }
}

fn parse_date(config: &Table, field: &str) -> Result<Option<NaiveDate>> {
    let Some(value) = config.get(field) else {
        return Ok(None);
    };
    let text = date_text(value).ok_or_else(|| Error::invalid(field, "must be a YYYY-MM-DD date"))?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map(Some)
        .map_err(|_| {
            Error::invalid(field, format!("{text} is not in the YYYY-MM-DD format"))
        })
}

fn validate_dates(config: &Table) -> Result<()> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            return Err(Error::invalid(
                "end_date",
                "the end date must be after the start date",
            ));
        }
    }
    Ok(())
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

fn in_range(value: f64, limit: f64) -> bool {
    (-limit..=limit).contains(&value)
}

fn validate_roi(config: &Table) -> Result<()> {
    const FIELD: &str = "roi_lat_lon";
    match config.get(FIELD) {
        None => Ok(()),
        Some(Value::Array(pair)) if pair.len() == 2 => {
            let (Some(lat), Some(lon)) = (number(&pair[0]), number(&pair[1])) else {
                return Err(Error::invalid(FIELD, "point coordinates must be numbers"));
            };
            if !in_range(lat, 90.0) || !in_range(lon, 180.0) {
                return Err(Error::invalid(
                    FIELD,
                    format!("point ({lat}, {lon}) is out of the valid latitude/longitude range"),
                ));
            }
            Ok(())
        }
        Some(Value::Table(bbox)) => {
            let corner = |key: &str| {
                bbox.get(key).and_then(number).ok_or_else(|| {
                    Error::invalid(FIELD, format!("bounding box needs a numeric '{key}' value"))
                })
            };
            check_bbox(
                FIELD,
                &BoundingBox {
                    west: corner("W")?,
                    south: corner("S")?,
                    east: corner("E")?,
                    north: corner("N")?,
                },
            )
        }
        Some(_) => Err(Error::invalid(
            FIELD,
            "must be a [lat, lon] pair or a { N, S, E, W } table",
        )),
    }
}

/// Checks corner ordering and coordinate ranges of a bounding box, reporting
/// failures against `field`.
pub(crate) fn check_bbox(field: &str, bbox: &BoundingBox) -> Result<()> {
    let BoundingBox { west, south, east, north } = *bbox;
    if !(north > south) {
        return Err(Error::invalid(
            field,
            "the north coordinate must be greater than the south coordinate",
        ));
    }
    if !(west < east) {
        return Err(Error::invalid(
            field,
            "the west coordinate must be less than the east coordinate",
        ));
    }
    if !(in_range(north, 90.0)
        && in_range(south, 90.0)
        && in_range(east, 180.0)
        && in_range(west, 180.0))
    {
        return Err(Error::invalid(field, "coordinates are out of the valid range"));
    }
    Ok(())
}

fn validate_region_name(config: &Table) -> Result<()> {
    match config.get("region") {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(Error::invalid("region", "must be the name of a stored region")),
    }
}

fn validate_platform(config: &Table) -> Result<()> {
    let platform = match config.get("platform") {
        None => None,
        Some(Value::String(s)) => Some(s.parse::<Platform>()?),
        Some(_) => return Err(Error::invalid("platform", "must be a string")),
    };

    match (config.get("product_type"), platform) {
        (None, _) => Ok(()),
        (Some(Value::String(product_type)), Some(platform)) => {
            if platform.supports(product_type) {
                Ok(())
            } else {
                Err(Error::invalid(
                    "product_type",
                    format!("{product_type} is not a valid product type for {platform}"),
                ))
            }
        }
        (Some(Value::String(_)), None) => Err(Error::invalid(
            "product_type",
            "a valid platform is required to check the product type",
        )),
        (Some(_), _) => Err(Error::invalid("product_type", "must be a string")),
    }
}

fn validate_cloud(config: &Table) -> Result<()> {
    match config.get("cloud") {
        None => Ok(()),
        Some(Value::Integer(c)) if (0..=100).contains(c) => Ok(()),
        Some(_) => Err(Error::invalid("cloud", "must be an integer between 0 and 100")),
    }
}
