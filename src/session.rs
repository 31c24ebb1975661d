use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use reqwest::{redirect, Client};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::PortalConfig;
use crate::login_page::{classify_login_page, IdValue, LoginResult};
use crate::renewal::{classify_renewal_response, PortalResponse, RenewalOutcome};
use crate::report;
use crate::utils::{get_random_user_agent, RateLimiter};

const LOGIN_PATH: &str = "cgi-bin/koha/opac-user.pl";
const RENEW_PATH: &str = "cgi-bin/koha/opac-renew.pl";

/// An authenticated browsing session against the portal.
///
/// Two clients share one cookie jar: login follows redirects like a
/// browser, while renewals keep redirects disabled because the
/// `Location` header is where the confirmation lives.
pub struct OpacSession {
    client: Client,
    renew_client: Client,
    base_url: Url,
    rate_limiter: RateLimiter,
}

impl OpacSession {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).context("Invalid portal base URL")?;
        let jar = Arc::new(Jar::default());
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()?;
        let renew_client = Client::builder()
            .cookie_provider(jar)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            renew_client,
            base_url,
            rate_limiter: RateLimiter::new(config.rate_limit),
        })
    }

    /// Submit credentials and classify the page that comes back.
    pub async fn login(&self, userid: &str, password: &str) -> Result<LoginResult> {
        let user_agent = get_random_user_agent();

        // Warm-up GET seeds the session cookie before credentials go out.
        self.rate_limiter.wait().await;
        let opac_url = self.base_url.join("opac")?;
        log::debug!("Priming session at {}", opac_url);
        self.client
            .get(opac_url)
            .header("User-Agent", user_agent)
            .send()
            .await
            .context("Failed to reach the portal")?;

        self.rate_limiter.wait().await;
        let login_url = self.base_url.join(LOGIN_PATH)?;
        let form = [
            ("koha_login_context", "opac"),
            ("userid", userid),
            ("password", password),
        ];
        let response = self
            .client
            .post(login_url)
            .header("User-Agent", user_agent)
            .form(&form)
            .send()
            .await
            .context("Failed to submit login form")?;
        let html = response
            .text()
            .await
            .context("Failed to read login response body")?;

        Ok(classify_login_page(&html))
    }

    /// Request a renewal for one item and classify the outcome.
    pub async fn renew(&self, item_id: i64, borrower_id: &IdValue) -> Result<RenewalOutcome> {
        self.rate_limiter.wait().await;

        let mut url = self.base_url.join(RENEW_PATH)?;
        url.query_pairs_mut()
            .append_pair("from", "opac_user")
            .append_pair("item", &item_id.to_string())
            .append_pair("borrowernumber", &borrower_id.to_string());
        log::debug!("Requesting renewal of item {}", item_id);

        let response = self
            .renew_client
            .get(url)
            .header("User-Agent", get_random_user_agent())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", self.base_url.join(LOGIN_PATH)?.as_str())
            .send()
            .await
            .context("Failed to request renewal")?;

        let snapshot = into_portal_response(response).await;
        Ok(classify_renewal_response(&snapshot))
    }
}

/// Snapshot a live response into the plain value the classifier takes.
async fn into_portal_response(response: reqwest::Response) -> PortalResponse {
    let status = response.status().as_u16();
    let is_redirect = response.status().is_redirection();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect();
    // An unreadable body downgrades to empty; classification then lands
    // on Indeterminate instead of erroring the whole attempt.
    let body = response.text().await.unwrap_or_default();
    PortalResponse::new(status, is_redirect, headers, body)
}

/// Log in and condense the checkout list for the app's overview screen.
pub async fn get_book_info(config: &PortalConfig, userid: &str, password: &str) -> Result<Value> {
    let session = OpacSession::new(config)?;
    let login = session.login(userid, password).await?;
    Ok(report::book_info(&login))
}

/// Log in, then renew one item. Renewal only makes sense with a
/// borrower id in hand, so its absence is reported, not attempted.
pub async fn renew_book(
    config: &PortalConfig,
    userid: &str,
    password: &str,
    item_id: i64,
) -> Result<Value> {
    let session = OpacSession::new(config)?;
    let login = session.login(userid, password).await?;

    let LoginResult::Authenticated { patron, .. } = login else {
        return Ok(report::login_report(&login));
    };
    let Some(borrower_id) = patron.borrower_id else {
        return Ok(report::error("Missing borrower_id"));
    };

    let outcome = session.renew(item_id, &borrower_id).await?;
    Ok(report::renewal_report(&outcome))
}
