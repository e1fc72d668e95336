//! Destination records.
//!
//! A [`Record`] is the flat row an import populates field by field. The
//! importer only ever calls [`RecordSink::set_value`]; fields it never
//! touches keep whatever value the store already holds.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::images::CoinImage;

/// Storage class of a field, used to pick the SQLite column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Image,
}

macro_rules! fields {
    ($( $variant:ident => ($name:literal, $kind:ident) ),+ $(,)?) => {
        /// Named columns of the local coin schema that an import can set.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Field {
            $( $variant ),+
        }

        impl Field {
            pub const ALL: &'static [Field] = &[ $( Field::$variant ),+ ];

            /// Column name in the local schema.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Field::$variant => $name ),+
                }
            }

            pub fn kind(&self) -> FieldKind {
                match self {
                    $( Field::$variant => FieldKind::$kind ),+
                }
            }

            pub fn from_name(name: &str) -> Option<Field> {
                match name {
                    $( $name => Some(Field::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

fields! {
    Title => ("title", Text),
    Value => ("value", Number),
    Unit => ("unit", Text),
    Country => ("country", Text),
    Year => ("year", Number),
    Period => ("period", Text),
    Ruler => ("ruler", Text),
    Mint => ("mint", Text),
    Mintmark => ("mintmark", Text),
    Type => ("type", Text),
    Status => ("status", Text),
    Material => ("material", Text),
    Fineness => ("fineness", Text),
    Shape => ("shape", Text),
    Diameter => ("diameter", Number),
    Thickness => ("thickness", Number),
    Weight => ("weight", Number),
    Grade => ("grade", Text),
    Edge => ("edge", Text),
    ObvRev => ("obvrev", Text),
    Mintage => ("mintage", Number),
    DateEmis => ("dateemis", Text),
    CatalogNum1 => ("catalognum1", Text),
    CatalogNum2 => ("catalognum2", Text),
    CatalogNum3 => ("catalognum3", Text),
    CatalogNum4 => ("catalognum4", Text),
    Quantity => ("quantity", Number),
    PayPrice => ("payprice", Number),
    Url => ("url", Text),
    Features => ("features", Text),
    ObverseImg => ("obverseimg", Image),
    ObverseDesign => ("obversedesign", Text),
    ObverseDesigner => ("obversedesigner", Text),
    ReverseImg => ("reverseimg", Image),
    ReverseDesign => ("reversedesign", Text),
    ReverseDesigner => ("reversedesigner", Text),
    EdgeImg => ("edgeimg", Image),
}

impl Field {
    /// The numbered catalog-reference columns, in order.
    pub const CATALOG_NUMBERS: [Field; 4] = [
        Field::CatalogNum1,
        Field::CatalogNum2,
        Field::CatalogNum3,
        Field::CatalogNum4,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership status written to [`Field::Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Owned,
    Sale,
}

impl Status {
    pub fn from_swap_flag(for_swap: bool) -> Self {
        if for_swap {
            Status::Sale
        } else {
            Status::Owned
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Owned => "owned",
            Status::Sale => "sale",
        }
    }
}

/// A value assigned to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Image(CoinImage),
}

impl FieldValue {
    /// Convert a JSON scalar. Absent or null values become an empty string.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Real(n.as_f64().unwrap_or_default()),
            },
            Value::Bool(b) => FieldValue::Integer(i64::from(*b)),
            Value::Null => FieldValue::Text(String::new()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&CoinImage> {
        match self {
            FieldValue::Image(img) => Some(img),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Image(img) => write!(
                f,
                "<{} image {}x{}, {} bytes>",
                img.format_name(),
                img.width,
                img.height,
                img.data.len()
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(r: f64) -> Self {
        FieldValue::Real(r)
    }
}

impl From<CoinImage> for FieldValue {
    fn from(img: CoinImage) -> Self {
        FieldValue::Image(img)
    }
}

/// Anything an import can write named fields into.
pub trait RecordSink {
    fn set_value(&mut self, field: Field, value: FieldValue);
}

/// In-memory destination row holding only the fields that were set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<Field, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl RecordSink for Record {
    fn set_value(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(*field));
        }
        assert_eq!(Field::from_name("nope"), None);
    }

    #[test]
    fn image_fields_are_image_kind() {
        let images: Vec<_> = Field::ALL
            .iter()
            .filter(|f| f.kind() == FieldKind::Image)
            .collect();
        assert_eq!(
            images,
            vec![&Field::ObverseImg, &Field::ReverseImg, &Field::EdgeImg]
        );
    }

    #[test]
    fn status_from_swap_flag() {
        assert_eq!(Status::from_swap_flag(true).as_str(), "sale");
        assert_eq!(Status::from_swap_flag(false).as_str(), "owned");
    }

    #[test]
    fn json_scalars_convert() {
        assert_eq!(FieldValue::from_json(&json!(1900)), FieldValue::Integer(1900));
        assert_eq!(FieldValue::from_json(&json!(7.5)), FieldValue::Real(7.5));
        assert_eq!(FieldValue::from_json(&json!("A")), FieldValue::Text("A".into()));
        assert_eq!(FieldValue::from_json(&json!(null)), FieldValue::Text(String::new()));
    }

    #[test]
    fn record_keeps_last_value() {
        let mut record = Record::new();
        record.set_value(Field::Title, "first".into());
        record.set_value(Field::Title, "second".into());
        assert_eq!(record.text(Field::Title), Some("second"));
        assert_eq!(record.len(), 1);
        assert!(!record.contains(Field::Country));
    }
}
