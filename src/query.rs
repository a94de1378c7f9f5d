//! Query routing.
//!
//! Turns the free-text line typed by the user into a [`Query`]: one of the five
//! supported lookups plus its search value, or [`Query::Invalid`].

use serde::Serialize;
use std::fmt;

/// Prefix of a reference status lookup.
pub const STATUS_PREFIX: &str = "STATUS ";
/// Prefix of a client/account combination lookup.
pub const CLIENT_ACCOUNT_PREFIX: &str = "CLIENT/ACCOUNT ";
/// Prefix of an account lookup.
pub const ACCOUNT_PREFIX: &str = "ACCOUNT ";
/// Prefix of a client lookup.
pub const CLIENT_PREFIX: &str = "CLIENT ";
/// Keyword of the trade list dump, compared without spaces and case.
pub const TRADELIST_KEYWORD: &str = "TRADELIST";

/// The classified meaning of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Status,
    Account,
    Client,
    ClientAccount,
    #[serde(rename = "TRADELIST")]
    TradeList,
    Invalid,
}

impl Intent {
    /// Name of the sheet the intent reads from.
    pub fn sheet_name(&self) -> Option<&'static str> {
        match self {
            Intent::Status => Some("STATUS"),
            Intent::Account => Some("ACCOUNT"),
            Intent::Client => Some("CLIENT"),
            Intent::ClientAccount => Some("CLIENTACCOUNT"),
            Intent::TradeList => Some("TRADELIST"),
            Intent::Invalid => None,
        }
    }

    /// Message shown when a lookup of this kind matches nothing.
    ///
    /// Only the four keyed lookups can come back empty: TRADELIST returns the
    /// sheet even without rows and an invalid query never reaches a sheet, so
    /// both share the generic fallback line.
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Intent::Status => "No matching reference found.",
            Intent::Account => "No matching ACCOUNT data found.",
            Intent::Client => "No matching CLIENT data found.",
            Intent::ClientAccount => "No matching CLIENTACCOUNT data found.",
            Intent::TradeList | Intent::Invalid => "No matching data found.",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Status => write!(f, "STATUS"),
            Intent::Account => write!(f, "ACCOUNT"),
            Intent::Client => write!(f, "CLIENT"),
            Intent::ClientAccount => write!(f, "CLIENT/ACCOUNT"),
            Intent::TradeList => write!(f, "TRADELIST"),
            Intent::Invalid => write!(f, "INVALID"),
        }
    }
}

/// A routed query: the intent together with its search value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Status(String),
    Account(String),
    Client(String),
    ClientAccount(String),
    TradeList,
    Invalid,
}

impl Query {
    pub fn intent(&self) -> Intent {
        match self {
            Query::Status(_) => Intent::Status,
            Query::Account(_) => Intent::Account,
            Query::Client(_) => Intent::Client,
            Query::ClientAccount(_) => Intent::ClientAccount,
            Query::TradeList => Intent::TradeList,
            Query::Invalid => Intent::Invalid,
        }
    }

    /// The search value, for the intents that carry one.
    pub fn value(&self) -> Option<&str> {
        match self {
            Query::Status(v) | Query::Account(v) | Query::Client(v) | Query::ClientAccount(v) => {
                Some(v.as_str())
            }
            Query::TradeList | Query::Invalid => None,
        }
    }
}

/// Classify a raw query string.
///
/// The input is trimmed, then checked against the prefixes in a fixed order;
/// the first match wins. Prefixes are case-sensitive. `TRADELIST` is the one
/// exception: it matches regardless of case and of any spaces in the input.
///
/// # Examples
/// ```
/// use sheetgate::query::{route, Query};
///
/// assert_eq!(route("STATUS ABC123"), Query::Status("ABC123".to_string()));
/// assert_eq!(route("  TradeList  "), Query::TradeList);
/// assert_eq!(route("FOO"), Query::Invalid);
/// ```
pub fn route(raw: &str) -> Query {
    let query = raw.trim();

    if let Some(rest) = query.strip_prefix(STATUS_PREFIX) {
        return Query::Status(rest.trim().to_string());
    }
    // Checked before ACCOUNT and CLIENT so the longer prefix is never shadowed.
    if let Some(rest) = query.strip_prefix(CLIENT_ACCOUNT_PREFIX) {
        return Query::ClientAccount(rest.trim().to_string());
    }
    if let Some(rest) = query.strip_prefix(ACCOUNT_PREFIX) {
        return Query::Account(rest.trim().to_string());
    }
    if let Some(rest) = query.strip_prefix(CLIENT_PREFIX) {
        return Query::Client(rest.trim().to_string());
    }

    let squashed: String = query.chars().filter(|c| *c != ' ').collect();
    if squashed.to_uppercase() == TRADELIST_KEYWORD {
        return Query::TradeList;
    }

    Query::Invalid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_each_prefix() {
        assert_eq!(route("STATUS ABC123"), Query::Status("ABC123".into()));
        assert_eq!(route("ACCOUNT C100"), Query::Account("C100".into()));
        assert_eq!(route("CLIENT X1"), Query::Client("X1".into()));
        assert_eq!(
            route("CLIENT/ACCOUNT 147572INET/C1"),
            Query::ClientAccount("147572INET/C1".into())
        );
    }

    #[test]
    fn trims_outer_whitespace_and_value() {
        assert_eq!(route("   STATUS    ABC123   "), Query::Status("ABC123".into()));
    }

    #[test]
    fn tradelist_ignores_case_and_spaces() {
        assert_eq!(route("  TradeList  "), Query::TradeList);
        assert_eq!(route("trade list"), Query::TradeList);
        assert_eq!(route("T R A D E L I S T"), Query::TradeList);
        assert_eq!(route("TRADELISTS"), Query::Invalid);
    }

    #[test]
    fn prefixes_are_case_sensitive() {
        assert_eq!(route("status ABC123"), Query::Invalid);
        assert_eq!(route("Client X1"), Query::Invalid);
    }

    #[test]
    fn bare_prefix_is_invalid_after_trim() {
        assert_eq!(route("ACCOUNT "), Query::Invalid);
        assert_eq!(route("STATUS"), Query::Invalid);
    }

    #[test]
    fn unknown_input_is_invalid() {
        assert_eq!(route("FOO"), Query::Invalid);
        assert_eq!(route(""), Query::Invalid);
        assert_eq!(Query::Invalid.intent(), Intent::Invalid);
        assert_eq!(Query::Invalid.value(), None);
    }

    #[test]
    fn value_keeps_inner_spaces_and_slashes() {
        let q = route("CLIENT/ACCOUNT 147572INET/C1 extra");
        assert_eq!(q.intent(), Intent::ClientAccount);
        assert_eq!(q.value(), Some("147572INET/C1 extra"));
    }

    #[test]
    fn intent_json_names() {
        let name = |intent: Intent| serde_json::to_value(intent).unwrap();
        assert_eq!(name(Intent::TradeList), "TRADELIST");
        assert_eq!(name(Intent::Status), "STATUS");
        assert_eq!(name(Intent::ClientAccount), "CLIENT_ACCOUNT");
    }

    #[test]
    fn not_found_messages() {
        assert_eq!(Intent::Status.not_found_message(), "No matching reference found.");
        assert_eq!(
            Intent::ClientAccount.not_found_message(),
            "No matching CLIENTACCOUNT data found."
        );
        assert_eq!(Intent::TradeList.not_found_message(), "No matching data found.");
    }
}
