//! Best-effort discovery of the provider's own order identifier.
//!
//! The provider does not reliably return its order id in a fixed field. Depending on the endpoint and the day, it
//! turns up as `orderId`, `data.id`, `data.items[0].transactionId` and so on, sometimes next to ids that belong to
//! *other* orders (e.g. a list of the account's recent orders). [`extract_provider_order_id`] walks the response and
//! picks the most plausible candidate:
//!
//! 1. An explicit top-level `orderId` (or `items[0].orderId`) that is not a UUID.
//! 2. A targeted search: objects that carry a recipient phone number different from ours are skipped along with
//!    everything beneath them.
//! 3. A global search with the same rules, minus the recipient filter.
//!
//! The search never fails. If nothing qualifies, the caller's fallback (its own reference) is returned.
use log::*;
use serde_json::{Map, Value};

use crate::helpers::{is_uuid, try_normalize_phone};

const MAX_DEPTH: usize = 5;
const MIN_ID_LENGTH: usize = 4;
const MIN_BARE_STRING_LENGTH: usize = 6;

/// Field names that may hold an order identifier, in order of preference.
const ID_FIELDS: [&str; 14] = [
    "orderId",
    "order_id",
    "orderID",
    "providerOrderId",
    "orderNumber",
    "order_number",
    "transactionId",
    "transaction_id",
    "transactionID",
    "txnId",
    "trxId",
    "id",
    "_id",
    "externalId",
];

/// Field names that may hold the recipient's phone number.
const PHONE_FIELDS: [&str; 10] = [
    "recipient",
    "recipientPhone",
    "recipient_phone",
    "recipientNumber",
    "phone",
    "phoneNumber",
    "phone_number",
    "msisdn",
    "beneficiary",
    "number",
];

/// Values that show up in id-like fields but are never identifiers.
const NON_ID_LITERALS: [&str; 20] = [
    "success",
    "successful",
    "failed",
    "failure",
    "error",
    "pending",
    "processing",
    "queued",
    "completed",
    "delivered",
    "cancelled",
    "rejected",
    "refunded",
    "true",
    "false",
    "null",
    "undefined",
    "ok",
    "yes",
    "no",
];

/// Returns the provider's order id from `response`, or `fallback` if no plausible candidate is found.
///
/// `response` may be a JSON tree or a string containing JSON. `target_phone` is the recipient of the order we are
/// looking for, in any format accepted by [`crate::normalize_phone`].
pub fn extract_provider_order_id(response: &Value, fallback: &str, target_phone: Option<&str>) -> String {
    match find_provider_order_id(response, target_phone) {
        Some(id) => id,
        None => {
            trace!("📡️ No provider order id found in response. Falling back to {fallback}");
            fallback.to_string()
        },
    }
}

/// The search behind [`extract_provider_order_id`]. Returns `None` if nothing plausible is found.
pub fn find_provider_order_id(response: &Value, target_phone: Option<&str>) -> Option<String> {
    let decoded;
    let root = match response {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(v @ (Value::Object(_) | Value::Array(_))) => {
                decoded = v;
                &decoded
            },
            _ => return bare_string_id(s),
        },
        v => v,
    };
    let target = target_phone.and_then(try_normalize_phone);
    if let Some(id) = explicit_order_id(root) {
        return Some(id);
    }
    if let Some(target) = target.as_deref() {
        let targeted = Search { target_phone: Some(target), filter_recipients: true };
        if let Some(id) = targeted.visit(root, 0, false) {
            trace!("📡️ Found provider order id {id} in the subtree for recipient {target}");
            return Some(id);
        }
    }
    let global = Search { target_phone: target.as_deref(), filter_recipients: false };
    global.visit(root, 0, false)
}

fn bare_string_id(s: &str) -> Option<String> {
    let s = s.trim();
    let qualifies = s.chars().count() >= MIN_BARE_STRING_LENGTH && !is_uuid(s) && !is_non_id_literal(s);
    qualifies.then(|| s.to_string())
}

fn explicit_order_id(root: &Value) -> Option<String> {
    [&root["orderId"], &root["items"][0]["orderId"]].into_iter().find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() && !is_uuid(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn is_non_id_literal(s: &str) -> bool {
    let s = s.trim().to_lowercase();
    NON_ID_LITERALS.contains(&s.as_str())
}

struct Search<'a> {
    target_phone: Option<&'a str>,
    filter_recipients: bool,
}

impl Search<'_> {
    /// Depth-first walk. At each object the id fields are scanned first, then array children, then object children.
    /// `confirmed` is true once an ancestor's recipient has matched the target phone, which relaxes the minimum id
    /// length.
    fn visit(&self, value: &Value, depth: usize, confirmed: bool) -> Option<String> {
        if depth > MAX_DEPTH {
            return None;
        }
        match value {
            Value::Array(items) => items.iter().find_map(|item| self.visit(item, depth + 1, confirmed)),
            Value::Object(map) => {
                let confirmed = match self.recipient_check(map) {
                    RecipientCheck::Mismatch => return None,
                    RecipientCheck::Match => true,
                    RecipientCheck::Absent => confirmed,
                };
                if let Some(id) = ID_FIELDS.iter().find_map(|f| map.get(*f).and_then(|v| self.candidate(v, confirmed)))
                {
                    return Some(id);
                }
                map.values()
                    .filter(|v| v.is_array())
                    .chain(map.values().filter(|v| v.is_object()))
                    .find_map(|child| self.visit(child, depth + 1, confirmed))
            },
            _ => None,
        }
    }

    fn recipient_check(&self, map: &Map<String, Value>) -> RecipientCheck {
        if !self.filter_recipients {
            return RecipientCheck::Absent;
        }
        let phone = PHONE_FIELDS.iter().find_map(|f| match map.get(*f) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
        match (phone, self.target_phone) {
            (None, _) => RecipientCheck::Absent,
            (Some(phone), Some(target)) if try_normalize_phone(&phone).as_deref() == Some(target) => {
                RecipientCheck::Match
            },
            (Some(_), _) => RecipientCheck::Mismatch,
        }
    }

    fn candidate(&self, value: &Value, confirmed: bool) -> Option<String> {
        let (s, is_string) = match value {
            Value::String(s) => (s.trim().to_string(), true),
            Value::Number(n) => (n.to_string(), false),
            _ => return None,
        };
        if s.is_empty() || is_uuid(&s) || is_non_id_literal(&s) {
            return None;
        }
        if let Some(target) = self.target_phone {
            if try_normalize_phone(&s).as_deref() == Some(target) {
                return None;
            }
        }
        let min_length = if confirmed { 1 } else { MIN_ID_LENGTH };
        if is_string && s.chars().count() < min_length {
            return None;
        }
        Some(s)
    }
}

enum RecipientCheck {
    Absent,
    Match,
    Mismatch,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    const FALLBACK: &str = "BDL-REF-0001";

    #[test]
    fn explicit_order_id_wins() {
        let response = json!({ "orderId": "ABC123", "status": "success" });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "ABC123");
        let response = json!({ "items": [{ "orderId": "ITEM-778" }], "data": { "id": "OTHER-1" } });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "ITEM-778");
    }

    #[test]
    fn uuid_order_ids_are_ignored() {
        let response = json!({ "orderId": "3f2b8c1e-9d4a-4e6b-8f0a-1c2d3e4f5a6b" });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), FALLBACK);
        let response = json!({ "data": { "id": "3f2b8c1e-9d4a-4e6b-8f0a-1c2d3e4f5a6b" } });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), FALLBACK);
    }

    #[test]
    fn targeted_search_matches_recipient() {
        let response = json!({ "data": { "recipient": "0244000000", "id": "X1" } });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, Some("233244000000")), "X1");
    }

    #[test]
    fn other_recipients_are_skipped() {
        let response = json!({
            "data": {
                "orders": [
                    { "recipient": "0209999999", "id": "WRONG-1", "meta": { "transactionId": "WRONG-2" } },
                    { "phone": "233244000000", "transactionId": "RIGHT-42" }
                ]
            }
        });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, Some("0244000000")), "RIGHT-42");
    }

    #[test]
    fn global_search_runs_when_targeted_search_fails() {
        let response = json!({ "data": { "recipient": "0209999999", "order_id": "ORD-5555" } });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, Some("0244000000")), "ORD-5555");
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "ORD-5555");
    }

    #[test]
    fn literals_short_values_and_phones_are_rejected() {
        let response = json!({
            "id": "success",
            "data": { "orderId": "X9", "transactionId": "0244000000", "id": true }
        });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, Some("0244000000")), FALLBACK);
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let response = json!({ "success": true, "data": { "id": 98765 } });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "98765");
    }

    #[test]
    fn arrays_are_searched_before_nested_objects() {
        let response = json!({
            "meta": { "id": "FROM-OBJECT" },
            "results": [{ "id": "FROM-ARRAY" }]
        });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "FROM-ARRAY");
    }

    #[test]
    fn search_depth_is_bounded() {
        let response = json!({ "a": { "b": { "c": { "d": { "e": { "f": { "id": "TOO-DEEP" } } } } } } });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), FALLBACK);
        let response = json!({ "a": { "b": { "c": { "id": "DEEP-ENOUGH" } } } });
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "DEEP-ENOUGH");
    }

    #[test]
    fn string_encoded_responses() {
        let response = Value::String(r#"{"data":{"transaction_id":"TX-10001"}}"#.to_string());
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "TX-10001");
        let response = Value::String("PRV-778899".to_string());
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), "PRV-778899");
        let response = Value::String("3f2b8c1e-9d4a-4e6b-8f0a-1c2d3e4f5a6b".to_string());
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), FALLBACK);
        let response = Value::String("short".to_string());
        assert_eq!(extract_provider_order_id(&response, FALLBACK, None), FALLBACK);
    }

    #[test]
    fn empty_and_scalar_responses_fall_back() {
        for response in [Value::Null, json!({}), json!([]), json!(true), json!(12)] {
            assert_eq!(extract_provider_order_id(&response, FALLBACK, None), FALLBACK);
        }
    }
}
