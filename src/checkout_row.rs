use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::dom;

/// One borrowed item as listed on the patron's summary page.
///
/// Every field is optional: the portal's markup is not contract-stable,
/// so each lookup degrades to None instead of failing the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkout {
    pub title: Option<String>,
    pub author: Option<String>,
    pub due_date: Option<String>,
    pub call_number: Option<String>,
    pub renewals_remaining: Option<u32>,
    pub renewals_total: Option<u32>,
    pub fines: Option<String>,
    pub biblionumber: Option<i64>,
    pub item_id: Option<i64>,
}

impl Checkout {
    /// A row is worth keeping only if it identifies an item somehow.
    /// Renewal counts and fines alone do not qualify.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.due_date.is_none()
            && self.call_number.is_none()
            && self.biblionumber.is_none()
            && self.item_id.is_none()
    }
}

/// Extract one checkout record from a `table#checkoutst` body row.
/// Never fails; fields the row does not carry come back as None.
pub fn extract_checkout_row(row: ElementRef) -> Checkout {
    let (renewals_remaining, renewals_total) = renewals(row);
    Checkout {
        title: title(row),
        author: dom::select_text(row, "td[class*='author']"),
        due_date: due_date(row),
        call_number: dom::select_text(row, "td[class*='call_no']"),
        renewals_remaining,
        renewals_total,
        fines: dom::select_text(row, "td[class*='fines']"),
        biblionumber: biblionumber(row),
        item_id: item_id(row),
    }
}

fn title(row: ElementRef) -> Option<String> {
    // The biblio-title span is the clean form; the bare cell text drags
    // in subtitle and medium decorations.
    match dom::select_first(row, "td[class*='title'] span[class*='biblio-title']") {
        Some(span) => {
            let text = dom::text_of(span);
            let cleaned = text.trim_matches(|c| c == ' ' || c == '/');
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned.to_string())
            }
        }
        None => dom::select_text(row, "td[class*='title']"),
    }
}

fn due_date(row: ElementRef) -> Option<String> {
    let cell = dom::select_first(row, "td[class*='date_due']")?;
    let text = cell.text().collect::<String>();
    let re = Regex::new(r"\d{2}/\d{2}/\d{4}").ok()?;
    re.find(&text).map(|m| m.as_str().to_string())
}

fn renewals(row: ElementRef) -> (Option<u32>, Option<u32>) {
    let Some(cell) = dom::select_first(row, "td[class*='renew']") else {
        return (None, None);
    };
    let text = cell.text().collect::<String>();
    let Ok(re) = Regex::new(r"(?i)(\d+)\s+of\s+(\d+)\s+renewals remaining") else {
        return (None, None);
    };
    let Some(caps) = re.captures(&text) else {
        return (None, None);
    };
    match (caps[1].parse().ok(), caps[2].parse().ok()) {
        (Some(remaining), Some(total)) => (Some(remaining), Some(total)),
        _ => (None, None),
    }
}

fn biblionumber(row: ElementRef) -> Option<i64> {
    let link = dom::select_first(
        row,
        "td[class*='title'] a[href*='opac-detail.pl?biblionumber=']",
    )?;
    let href = link.value().attr("href")?;
    let caps = Regex::new(r"biblionumber=(\d+)").ok()?.captures(href)?;
    caps[1].parse().ok()
}

fn item_id(row: ElementRef) -> Option<i64> {
    if let Some(link) = dom::select_first(row, "td[class*='renew'] a[href*='opac-renew.pl']") {
        if let Some(href) = link.value().attr("href") {
            if let Some(caps) = Regex::new(r"item=(\d+)").ok()?.captures(href) {
                if let Ok(id) = caps[1].parse() {
                    return Some(id);
                }
            }
        }
    }
    let checkbox = dom::select_first(row, "td[class*='renew'] input[name='item']")?;
    let value = checkbox.value().attr("value")?;
    value.trim().parse().ok()
}
