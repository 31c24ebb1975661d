use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checkout_row::{extract_checkout_row, Checkout};
use crate::dom;

/// Identifier that the portal usually renders as a number but is not
/// guaranteed to; non-numeric values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Raw(String),
}

impl IdValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = trimmed.parse::<i64>() {
                return IdValue::Number(n);
            }
        }
        IdValue::Raw(raw.to_string())
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            IdValue::Number(n) => Some(*n),
            IdValue::Raw(_) => None,
        }
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Number(n) => write!(f, "{}", n),
            IdValue::Raw(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patron {
    pub name: Option<String>,
    pub borrower_id: Option<IdValue>,
}

/// Outcome of inspecting the page the portal serves after a login attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginResult {
    Authenticated {
        patron: Patron,
        checkouts: Vec<Checkout>,
    },
    Unauthenticated {
        reason: String,
    },
    Indeterminate {
        reason: String,
    },
}

/// Classify the HTML returned after submitting the login form.
///
/// The login-page check runs first and wins over everything else: a page
/// that still shows the login form means the credentials did not take,
/// whatever else happens to be in the markup.
pub fn classify_login_page(html: &str) -> LoginResult {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    if is_login_page(&doc) {
        return LoginResult::Unauthenticated {
            reason: "Invalid credentials or not logged in".to_string(),
        };
    }

    if dom::select_first(root, "#opac-user").is_none()
        && dom::select_first(root, "#opac-user-checkouts").is_none()
    {
        return LoginResult::Indeterminate {
            reason: "Unknown state".to_string(),
        };
    }

    let patron = Patron {
        name: patron_name(&doc),
        borrower_id: dom::hidden_input_value(root, "borrowernumber")
            .map(|value| IdValue::parse(&value)),
    };

    let mut checkouts = Vec::new();
    if let Ok(row_selector) = Selector::parse("table#checkoutst tbody tr") {
        for row in doc.select(&row_selector) {
            let checkout = extract_checkout_row(row);
            if !checkout.is_empty() {
                checkouts.push(checkout);
            }
        }
    }

    LoginResult::Authenticated { patron, checkouts }
}

fn is_login_page(doc: &Html) -> bool {
    let root = doc.root_element();
    if dom::select_first(root, "#opac-login-page").is_some() {
        return true;
    }
    if let Some(title) = dom::select_first(root, "title") {
        if dom::text_of(title)
            .to_lowercase()
            .contains("log in to your account")
        {
            return true;
        }
    }
    false
}

fn patron_name(doc: &Html) -> Option<String> {
    let span = dom::select_first(doc.root_element(), "span[class*='userlabel']")?;
    let text = dom::text_of(span);
    if text.is_empty() {
        return None;
    }
    let re = Regex::new(r"(?i)^Welcome,\s*").ok()?;
    Some(re.replace(&text, "").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_PAGE: &str = r#"
        <!DOCTYPE html>
        <html>
            <head><title>Your library home</title></head>
            <body id="opac-user">
                <span class="loggedinusername userlabel">Welcome, JANE DOE</span>
                <form>
                    <input type="hidden" name="borrowernumber" value="12345">
                </form>
                <div id="opac-user-checkouts">
                    <table id="checkoutst">
                        <tbody>
                            <tr>
                                <td class="title">
                                    <a href="/cgi-bin/koha/opac-detail.pl?biblionumber=37405">
                                        <span class="biblio-title">Economics /</span>
                                    </a>
                                </td>
                                <td class="author">Parkin, Michael,</td>
                                <td class="date_due">Due 07/12/2025 23:59</td>
                                <td class="call_no">Call number: 330 PAR</td>
                                <td class="renew">
                                    <input type="checkbox" name="item" value="58734">
                                    <a href="/cgi-bin/koha/opac-renew.pl?from=opac_user&item=58734&borrowernumber=12345">Renew</a>
                                    24 of 30 renewals remaining
                                </td>
                                <td class="fines">Fines: No</td>
                            </tr>
                            <tr>
                                <td class="title">Introduction to Algorithms</td>
                                <td class="author"></td>
                                <td class="date_due">overdue</td>
                            </tr>
                        </tbody>
                    </table>
                </div>
            </body>
        </html>
    "#;

    const LOGIN_PAGE: &str = r#"
        <html>
            <head><title>Koha online catalog &rsaquo; Log in to your account</title></head>
            <body id="opac-login-page">
                <form action="/cgi-bin/koha/opac-user.pl" method="post">
                    <input type="hidden" name="koha_login_context" value="opac">
                </form>
            </body>
        </html>
    "#;

    #[test]
    fn test_authenticated_page() {
        let result = classify_login_page(USER_PAGE);

        let LoginResult::Authenticated { patron, checkouts } = result else {
            panic!("expected authenticated result, got {:?}", result);
        };

        assert_eq!(patron.name.as_deref(), Some("JANE DOE"));
        assert_eq!(patron.borrower_id, Some(IdValue::Number(12345)));

        assert_eq!(checkouts.len(), 2);
        let first = &checkouts[0];
        assert_eq!(first.title.as_deref(), Some("Economics"));
        assert_eq!(first.author.as_deref(), Some("Parkin, Michael,"));
        assert_eq!(first.due_date.as_deref(), Some("07/12/2025"));
        assert_eq!(first.call_number.as_deref(), Some("Call number: 330 PAR"));
        assert_eq!(first.renewals_remaining, Some(24));
        assert_eq!(first.renewals_total, Some(30));
        assert_eq!(first.fines.as_deref(), Some("Fines: No"));
        assert_eq!(first.biblionumber, Some(37405));
        assert_eq!(first.item_id, Some(58734));

        // Row order follows the document; the sparse row keeps its place
        assert_eq!(
            checkouts[1].title.as_deref(),
            Some("Introduction to Algorithms")
        );
        assert_eq!(checkouts[1].due_date, None);
    }

    #[test]
    fn test_login_marker_wins_over_everything() {
        let html = format!(
            "<html><body><div id=\"opac-login-page\"></div>{}</body></html>",
            "<div id=\"opac-user\"><span class=\"userlabel\">Welcome, X</span></div>"
        );
        let result = classify_login_page(&html);
        assert_eq!(
            result,
            LoginResult::Unauthenticated {
                reason: "Invalid credentials or not logged in".to_string()
            }
        );
    }

    #[test]
    fn test_login_page_by_title() {
        let result = classify_login_page(LOGIN_PAGE);
        assert!(matches!(result, LoginResult::Unauthenticated { .. }));

        // The title match alone is enough, whatever the case
        let by_title =
            "<html><head><title>LOG IN TO YOUR ACCOUNT</title></head><body></body></html>";
        assert!(matches!(
            classify_login_page(by_title),
            LoginResult::Unauthenticated { .. }
        ));
    }

    #[test]
    fn test_unrecognized_page() {
        let result = classify_login_page("<html><body><h1>503 Service Unavailable</h1></body></html>");
        assert_eq!(
            result,
            LoginResult::Indeterminate {
                reason: "Unknown state".to_string()
            }
        );
    }

    #[test]
    fn test_user_page_without_checkouts_table() {
        let html = r#"<html><body id="opac-user">
            <span class="userlabel">Welcome, JANE DOE</span>
        </body></html>"#;

        let LoginResult::Authenticated { patron, checkouts } = classify_login_page(html) else {
            panic!("expected authenticated result");
        };
        assert_eq!(patron.name.as_deref(), Some("JANE DOE"));
        assert_eq!(patron.borrower_id, None);
        assert!(checkouts.is_empty());
    }

    #[test]
    fn test_non_numeric_borrower_id_kept_raw() {
        let html = r#"<html><body id="opac-user">
            <input type="hidden" name="borrowernumber" value="B-772">
        </body></html>"#;

        let LoginResult::Authenticated { patron, .. } = classify_login_page(html) else {
            panic!("expected authenticated result");
        };
        assert_eq!(patron.borrower_id, Some(IdValue::Raw("B-772".to_string())));
    }

    #[test]
    fn test_patron_name_without_welcome_prefix() {
        let html = r#"<html><body id="opac-user">
            <span class="userlabel">JANE DOE</span>
        </body></html>"#;

        let LoginResult::Authenticated { patron, .. } = classify_login_page(html) else {
            panic!("expected authenticated result");
        };
        assert_eq!(patron.name.as_deref(), Some("JANE DOE"));
    }

    #[test]
    fn test_malformed_html_is_tolerated() {
        let html = "<html><body id=\"opac-user\"><table id=\"checkoutst\"><tr><td class=\"title\">Unclosed";
        assert!(matches!(
            classify_login_page(html),
            LoginResult::Authenticated { .. }
        ));
    }

    #[test]
    fn test_id_value_parse() {
        assert_eq!(IdValue::parse("58734"), IdValue::Number(58734));
        assert_eq!(IdValue::parse(" 58734 "), IdValue::Number(58734));
        assert_eq!(IdValue::parse("B-772"), IdValue::Raw("B-772".to_string()));
        assert_eq!(IdValue::parse(""), IdValue::Raw(String::new()));
        assert_eq!(IdValue::Number(58734).as_number(), Some(58734));
        assert_eq!(IdValue::Raw("x".to_string()).as_number(), None);
    }

    #[test]
    fn test_id_value_serializes_untagged() {
        assert_eq!(
            serde_json::to_string(&IdValue::Number(12345)).unwrap(),
            "12345"
        );
        assert_eq!(
            serde_json::to_string(&IdValue::Raw("B-772".to_string())).unwrap(),
            "\"B-772\""
        );
    }
}
