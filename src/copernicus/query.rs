//! OData query construction for the three search strategies.
use crate::criteria::{ParametricQuery, Region};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use url::Url;

pub const CATALOGUE_URL: &str = "https://catalogue.dataspace.copernicus.eu/odata/v1";

/// Single quotes are doubled inside OData string literals.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn timestamp(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

/// WKT footprint; coordinates are written longitude first.
pub fn footprint(region: &Region) -> String {
    match region {
        Region::Point { lat, lon } => format!("POINT({lon} {lat})"),
        Region::BoundingBox(b) => format!(
            "POLYGON(({w} {s},{e} {s},{e} {n},{w} {n},{w} {s}))",
            w = b.west,
            s = b.south,
            e = b.east,
            n = b.north
        ),
    }
}

pub fn name_filter(name: &str) -> String {
    format!("Name eq {}", literal(name))
}

pub fn parametric_filter(query: &ParametricQuery) -> String {
    let mut clauses = vec![
        format!("Collection/Name eq {}", literal(query.platform.as_str())),
        format!(
            "OData.CSC.Intersects(area=geography'SRID=4326;{}')",
            footprint(&query.region)
        ),
        format!("ContentDate/Start gt {}", timestamp(query.start_date)),
        format!("ContentDate/Start lt {}", timestamp(query.end_date)),
    ];
    if query.platform.filters_cloud_cover() {
        clauses.push(format!(
            "Attributes/OData.CSC.DoubleAttribute/any(att:att/Name eq 'cloudCover' \
             and att/OData.CSC.DoubleAttribute/Value lt {})",
            query.max_cloud_cover
        ));
    }
    clauses.push(format!(
        "Attributes/OData.CSC.StringAttribute/any(att:att/Name eq 'productType' \
         and att/OData.CSC.StringAttribute/Value eq {})",
        literal(&query.product_type)
    ));
    clauses.join(" and ")
}

fn parse(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::Search(format!("Invalid catalogue url '{url}': {e}")))
}

pub fn products_url(catalogue_url: &str, filter: &str) -> Result<Url> {
    let mut url = parse(&format!("{catalogue_url}/Products"))?;
    url.query_pairs_mut().append_pair("$filter", filter);
    Ok(url)
}

pub fn filter_list_url(catalogue_url: &str) -> Result<Url> {
    parse(&format!("{catalogue_url}/Products/OData.CSC.FilterList"))
}

pub fn filter_list_payload(names: &[String]) -> Value {
    let products = names
        .iter()
        .map(|name| json!({ "Name": name }))
        .collect::<Vec<_>>();
    json!({ "FilterProducts": products })
}

pub fn content_url(catalogue_url: &str, id: &str) -> String {
    format!("{catalogue_url}/Products({id})/$value")
}
