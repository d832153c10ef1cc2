use super::query;
use crate::criteria::SearchCriteria;
use crate::error::{Error, Result};
use crate::odata::CatalogOps;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// One catalogue entry, as returned in the `value` array of an OData feed.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ProductRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Online")]
    pub online: bool,
}

pub async fn search(ops: &impl CatalogOps, criteria: &SearchCriteria) -> Result<Vec<ProductRecord>> {
    let base = ops.catalogue_url();
    info!(strategy = criteria.strategy(), "Searching catalogue");

    let feed = match criteria {
        SearchCriteria::ByName(name) => {
            let url = query::products_url(base, &query::name_filter(name))?;
            ops.get_json(&url).await
        }
        SearchCriteria::ByList(names) => {
            let url = query::filter_list_url(base)?;
            ops.post_json(&url, &query::filter_list_payload(names)).await
        }
        SearchCriteria::ByParameters(params) => {
            let url = query::products_url(base, &query::parametric_filter(params))?;
            debug!(%url, "Parametric query");
            ops.get_json(&url).await
        }
    }
    .map_err(|e| Error::Search(format!("{e:#}")))?;

    parse_feed(feed)
}

/// A feed without a `value` array is an empty result, not an error.
fn parse_feed(mut feed: Value) -> Result<Vec<ProductRecord>> {
    let Some(value) = feed.as_object_mut().and_then(|o| o.remove("value")) else {
        debug!("No 'value' in catalogue response");
        return Ok(vec![]);
    };
    serde_json::from_value(value)
        .map_err(|e| Error::Search(format!("Unexpected product entry in response: {e}")))
}
