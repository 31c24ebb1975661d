use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::dom;
use crate::login_page::IdValue;

const REDIRECT_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// Plain-value snapshot of an HTTP response, decoupled from the
/// transport so classification stays a pure function.
#[derive(Debug, Clone, Default)]
pub struct PortalResponse {
    pub status: u16,
    pub is_redirect: bool,
    headers: HashMap<String, String>,
    pub body: String,
}

impl PortalResponse {
    pub fn new(
        status: u16,
        is_redirect: bool,
        headers: impl IntoIterator<Item = (String, String)>,
        body: String,
    ) -> Self {
        // Header names are folded to lower case once so lookups stay
        // case-insensitive without a custom map type.
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            is_redirect,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Outcome of a renewal attempt against the portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenewalOutcome {
    /// The portal confirmed these items as renewed, in row order.
    Renewed { item_ids: Vec<IdValue> },
    /// We landed on the patron page but no row carries a renewed marker.
    RenewedUnconfirmed,
    /// The portal bounced us to the login form mid-renewal.
    RequiresLogin {
        item_id: Option<IdValue>,
        borrower_id: Option<IdValue>,
    },
    Indeterminate,
}

/// Classify the response to a renewal request.
///
/// A redirect whose `Location` carries a `renewed` query parameter is the
/// fast confirmation path. A redirect without it is not an answer either
/// way, so the body gets parsed like any non-redirect response.
pub fn classify_renewal_response(response: &PortalResponse) -> RenewalOutcome {
    if response.is_redirect || REDIRECT_CODES.contains(&response.status) {
        if let Some(location) = response.header("Location") {
            if let Some(id) = renewed_param(location) {
                return RenewalOutcome::Renewed { item_ids: vec![id] };
            }
        }
    }
    classify_renewal_body(&response.body)
}

/// Classify a renewal response body on its own.
pub fn classify_renewal_body(body: &str) -> RenewalOutcome {
    if body.trim().is_empty() {
        return RenewalOutcome::Indeterminate;
    }

    let doc = Html::parse_document(body);
    let root = doc.root_element();

    if dom::select_first(root, "#opac-login-page").is_some() {
        return RenewalOutcome::RequiresLogin {
            item_id: dom::hidden_input_value(root, "item").map(|v| IdValue::parse(&v)),
            borrower_id: dom::hidden_input_value(root, "borrowernumber")
                .map(|v| IdValue::parse(&v)),
        };
    }

    if dom::select_first(root, "#opac-user").is_some() {
        let item_ids = renewed_row_ids(&doc);
        return if item_ids.is_empty() {
            RenewalOutcome::RenewedUnconfirmed
        } else {
            RenewalOutcome::Renewed { item_ids }
        };
    }

    RenewalOutcome::Indeterminate
}

fn renewed_param(location: &str) -> Option<IdValue> {
    let url = match Url::parse(location) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            // The portal sends relative Location headers; any origin
            // serves as a base for reading the query string.
            Url::parse("http://opac.invalid/").ok()?.join(location).ok()?
        }
        Err(_) => return None,
    };
    let value = url
        .query_pairs()
        .find(|(name, _)| name == "renewed")
        .map(|(_, value)| value.into_owned())?;
    if value.is_empty() {
        None
    } else {
        Some(IdValue::parse(&value))
    }
}

fn renewed_row_ids(doc: &Html) -> Vec<IdValue> {
    let mut ids = Vec::new();
    let Ok(row_selector) = Selector::parse("table#checkoutst tbody tr") else {
        return ids;
    };
    let Ok(marker) = Regex::new(r"(?i)\bRenewed!") else {
        return ids;
    };

    for row in doc.select(&row_selector) {
        let Some(cell) = dom::select_first(row, "td[class*='renew']") else {
            continue;
        };
        if !marker.is_match(&cell.text().collect::<String>()) {
            continue;
        }
        if let Some(id) = renewed_item_id(cell) {
            ids.push(IdValue::Number(id));
        }
    }
    ids
}

// Checkbox first: the confirmation page keeps the checkbox but often
// drops the renew link. When a checkbox exists its value decides,
// numeric or nothing; the link is only consulted in its absence.
fn renewed_item_id(renew_cell: ElementRef) -> Option<i64> {
    if let Some(checkbox) = dom::select_first(renew_cell, "input[name='item']") {
        return checkbox
            .value()
            .attr("value")
            .and_then(|v| v.trim().parse().ok());
    }
    let link = dom::select_first(renew_cell, "a[href*='opac-renew.pl']")?;
    let href = link.value().attr("href")?;
    let caps = Regex::new(r"item=(\d+)").ok()?.captures(href)?;
    caps[1].parse().ok()
}
