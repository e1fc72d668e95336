//! Numista API response shapes.
//!
//! Only the parts the importer reads are modeled. Anything optional in the
//! API is optional (or defaulted) here, so a missing key never fails a
//! parse. A JSON `null` is treated like a missing key. Keys the importer
//! cannot work without (`coin.id`, `coin.title`, `coin.issuer.name`) stay
//! required.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of the token endpoint.
///
/// Both keys are checked by [`crate::client::NumistaClient::exchange_code`];
/// they are optional here so their absence is reported as a missing field
/// rather than a generic parse error.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
}

/// Bearer credential for one import session. Held in memory only.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub user_id: u64,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// One page of `GET /users/{id}/collected_coins`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionPage {
    #[serde(default)]
    pub item_count: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub collected_coins: Vec<CollectedItem>,
}

fn empty_text() -> Value {
    Value::String(String::new())
}

/// One entry of the user's collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectedItem {
    #[serde(default)]
    pub id: Option<u64>,
    pub coin: CoinRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issue: Issue,
    #[serde(default, deserialize_with = "null_as_default")]
    pub private_comment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_comment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub grade: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub for_swap: bool,
    #[serde(default = "empty_text")]
    pub quantity: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Price,
}

impl CollectedItem {
    /// Stable identifier used as the store key.
    pub fn source_id(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => format!("coin-{}", self.coin.id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinRef {
    pub id: u64,
    pub title: String,
    pub issuer: Issuer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issuer {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    #[serde(default = "empty_text")]
    pub year: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mint_letter: String,
    #[serde(default = "empty_text")]
    pub mintage: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            year: empty_text(),
            mint_letter: String::new(),
            mintage: empty_text(),
            comment: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    #[serde(default = "empty_text")]
    pub value: Value,
}

impl Default for Price {
    fn default() -> Self {
        Self { value: empty_text() }
    }
}

/// `GET /coins/{id}` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemDetail {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<CoinValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ruler: Vec<Named>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub composition: Option<Composition>,
    #[serde(default)]
    pub weight: Option<Value>,
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default)]
    pub thickness: Option<Value>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mints: Vec<Named>,
    #[serde(default)]
    pub min_year: Option<i64>,
    #[serde(default)]
    pub max_year: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub references: Vec<CatalogReference>,
    #[serde(default)]
    pub obverse: Option<CoinSide>,
    #[serde(default)]
    pub reverse: Option<CoinSide>,
    #[serde(default)]
    pub edge: Option<CoinSide>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinValue {
    #[serde(default)]
    pub numeric_value: Option<Value>,
    #[serde(default)]
    pub currency: Option<Currency>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Currency {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Composition {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogReference {
    #[serde(default)]
    pub catalogue: Option<Catalogue>,
    #[serde(default)]
    pub number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub code: Option<String>,
}

/// Obverse, reverse, or edge of a coin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinSide {
    #[serde(default)]
    pub engravers: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_collected_item_defaults() {
        let item: CollectedItem = serde_json::from_str(
            r#"{"coin": {"id": 7, "title": "1 Franc", "issuer": {"name": "France"}}}"#,
        )
        .unwrap();
        assert_eq!(item.issue.year, Value::String(String::new()));
        assert_eq!(item.issue.mintage, Value::String(String::new()));
        assert_eq!(item.issue.comment, "");
        assert_eq!(item.price.value, Value::String(String::new()));
        assert!(!item.for_swap);
        assert_eq!(item.source_id(), "coin-7");
    }

    #[test]
    fn partial_issue_keeps_present_keys() {
        let item: CollectedItem = serde_json::from_str(
            r#"{"id": 3, "coin": {"id": 7, "title": "t", "issuer": {"name": "i"}},
                "issue": {"year": 1921}, "price": {}}"#,
        )
        .unwrap();
        assert_eq!(item.issue.year, serde_json::json!(1921));
        assert_eq!(item.issue.mint_letter, "");
        assert_eq!(item.price.value, Value::String(String::new()));
        assert_eq!(item.source_id(), "3");
    }

    #[test]
    fn collected_item_requires_coin() {
        let parsed: Result<CollectedItem, _> = serde_json::from_str(r#"{"for_swap": true}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_detail_parses() {
        let detail: ItemDetail = serde_json::from_str("{}").unwrap();
        assert!(detail.value.is_none());
        assert!(detail.references.is_empty());
        assert!(detail.obverse.is_none());
    }

    #[test]
    fn token_debug_hides_secret() {
        let token = AccessToken {
            token: "secret".into(),
            user_id: 42,
        };
        let shown = format!("{:?}", token);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("42"));
    }
}
