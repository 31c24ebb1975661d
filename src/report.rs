//! Wire envelopes for the downstream client.
//!
//! The mobile app parses a single JSON object per operation with a
//! `status` discriminant; these builders keep the classified result
//! types and the wire shapes from drifting apart.

use serde_json::{json, Value};

use crate::login_page::LoginResult;
use crate::renewal::RenewalOutcome;

pub fn error(message: &str) -> Value {
    json!({ "status": "error", "error": message })
}

/// Full login envelope: patron plus the complete checkout list.
pub fn login_report(result: &LoginResult) -> Value {
    match result {
        LoginResult::Authenticated { patron, checkouts } => json!({
            "status": "success",
            "user": patron,
            "checkouts": checkouts,
        }),
        LoginResult::Unauthenticated { reason } | LoginResult::Indeterminate { reason } => {
            error(reason)
        }
    }
}

/// Condensed listing the app uses for its due-date overview.
pub fn book_info(result: &LoginResult) -> Value {
    match result {
        LoginResult::Authenticated { checkouts, .. } => {
            let items: Vec<Value> = checkouts
                .iter()
                .map(|c| json!({ "item_id": c.item_id, "due_date": c.due_date }))
                .collect();
            json!({ "status": "success", "items": items })
        }
        LoginResult::Unauthenticated { reason } | LoginResult::Indeterminate { reason } => {
            error(reason)
        }
    }
}

pub fn renewal_report(outcome: &RenewalOutcome) -> Value {
    match outcome {
        RenewalOutcome::Renewed { item_ids } => json!({
            "status": "success",
            "renewal": { "status": "success", "item_ids": item_ids },
        }),
        RenewalOutcome::RenewedUnconfirmed => json!({
            "status": "success",
            "renewal": { "status": "unknown" },
        }),
        RenewalOutcome::RequiresLogin {
            item_id,
            borrower_id,
        } => json!({
            "status": "error",
            "error": "Renewal failed: not logged in",
            "error_code": "renewal_requires_login",
            "renewal": {
                "status": "failed",
                "reason": "not_logged_in",
                "item_id": item_id,
                "borrower_id": borrower_id,
            },
        }),
        RenewalOutcome::Indeterminate => json!({ "status": "unknown" }),
    }
}
