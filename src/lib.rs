// Koha OPAC client library
//
// Automates the circulation pages of a Koha online catalogue: patron
// login, checkout listing and item renewals, with each portal response
// classified into a structured outcome for a downstream client.

pub mod api;
pub mod checkout_row;
pub mod config;
mod dom;
pub mod history;
pub mod login_page;
pub mod renewal;
pub mod report;
pub mod session;
pub mod utils;

// Re-export main types for convenience
pub use checkout_row::{extract_checkout_row, Checkout};
pub use config::PortalConfig;
pub use login_page::{classify_login_page, IdValue, LoginResult, Patron};
pub use renewal::{classify_renewal_body, classify_renewal_response, PortalResponse, RenewalOutcome};
pub use session::OpacSession;
