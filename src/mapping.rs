//! Mapping Numista data onto destination records.
//!
//! Mapping happens in two passes per collected item:
//!
//! 1. Fields carried by the collection entry itself (title, country,
//!    comments, status, grade, issue data, quantity, price).
//! 2. Fields from the coin's catalog detail (value, physical attributes,
//!    provenance, catalog numbers, designs and pictures).
//!
//! The second pass needs one more request. If it fails the record keeps
//! what the first pass wrote and the import moves on; a missing picture
//! only leaves its image field unset.

use async_trait::async_trait;

use crate::client::NumistaClient;
use crate::error::CatalogError;
use crate::images::CoinImage;
use crate::models::{CatalogReference, CollectedItem, CoinSide, ItemDetail};
use crate::record::{Field, FieldValue, RecordSink, Status};

/// Maximum number of catalog references kept per coin.
pub const MAX_CATALOG_NUMBERS: usize = 4;

/// Where coin details and pictures come from.
#[async_trait]
pub trait CoinCatalog: Send + Sync {
    async fn fetch_detail(&self, coin_id: u64) -> Result<ItemDetail, CatalogError>;
    async fn fetch_image(&self, url: &str) -> Result<CoinImage, CatalogError>;
}

#[async_trait]
impl CoinCatalog for NumistaClient {
    async fn fetch_detail(&self, coin_id: u64) -> Result<ItemDetail, CatalogError> {
        NumistaClient::fetch_detail(self, coin_id).await
    }

    async fn fetch_image(&self, url: &str) -> Result<CoinImage, CatalogError> {
        NumistaClient::fetch_image(self, url).await
    }
}

/// What happened while mapping one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    pub detail_fetched: bool,
    pub images_set: u32,
    pub image_failures: u32,
}

/// Per-item mapper: list fields, then detail, then pictures.
pub struct ItemMapper<'a> {
    catalog: &'a dyn CoinCatalog,
    fetch_images: bool,
}

impl<'a> ItemMapper<'a> {
    pub fn new(catalog: &'a dyn CoinCatalog, fetch_images: bool) -> Self {
        Self {
            catalog,
            fetch_images,
        }
    }

    /// Populate `record` from `item`.
    ///
    /// Never fails: a detail or picture that cannot be fetched is logged,
    /// counted in the returned [`ItemOutcome`], and skipped.
    pub async fn set_record<R>(&self, record: &mut R, item: &CollectedItem) -> ItemOutcome
    where
        R: RecordSink + Send + ?Sized,
    {
        let mut outcome = ItemOutcome::default();
        map_collected_item(record, item);

        let coin_id = item.coin.id;
        let detail = match self.catalog.fetch_detail(coin_id).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(
                    coin_id,
                    error = %e,
                    "coin detail unavailable; keeping collection fields only"
                );
                return outcome;
            }
        };
        outcome.detail_fetched = true;
        map_detail(record, &detail);

        if self.fetch_images {
            for (field, url) in picture_targets(&detail) {
                match self.catalog.fetch_image(url).await {
                    Ok(image) => {
                        record.set_value(field, FieldValue::Image(image));
                        outcome.images_set += 1;
                    }
                    Err(e) => {
                        tracing::warn!(coin_id, url, field = %field, error = %e, "picture unavailable");
                        outcome.image_failures += 1;
                    }
                }
            }
        }

        outcome
    }
}

/// Write the fields carried by the collection entry.
pub fn map_collected_item<R: RecordSink + ?Sized>(record: &mut R, item: &CollectedItem) {
    record.set_value(Field::Title, item.coin.title.as_str().into());
    record.set_value(Field::Country, item.coin.issuer.name.as_str().into());
    record.set_value(Field::Features, join_comments(item).into());
    record.set_value(
        Field::Status,
        Status::from_swap_flag(item.for_swap).as_str().into(),
    );
    record.set_value(Field::Grade, item.grade.as_str().into());
    record.set_value(Field::Year, FieldValue::from_json(&item.issue.year));
    record.set_value(Field::Mintmark, item.issue.mint_letter.as_str().into());
    record.set_value(Field::Mintage, FieldValue::from_json(&item.issue.mintage));
    record.set_value(Field::Quantity, FieldValue::from_json(&item.quantity));
    record.set_value(Field::PayPrice, FieldValue::from_json(&item.price.value));
}

/// Issue comment, private comment and public comment, one per line.
pub fn join_comments(item: &CollectedItem) -> String {
    [
        item.issue.comment.as_str(),
        item.private_comment.as_str(),
        item.public_comment.as_str(),
    ]
    .join("\n")
}

/// Write the text and numeric fields of a coin detail.
pub fn map_detail<R: RecordSink + ?Sized>(record: &mut R, detail: &ItemDetail) {
    if let Some(value) = &detail.value {
        if let Some(numeric) = &value.numeric_value {
            record.set_value(Field::Value, FieldValue::from_json(numeric));
        }
        if let Some(currency) = &value.currency {
            if let Some(name) = &currency.name {
                record.set_value(Field::Unit, name.as_str().into());
            }
            if let Some(full_name) = &currency.full_name {
                record.set_value(Field::Period, full_name.as_str().into());
            }
        }
    }
    if let Some(url) = &detail.url {
        record.set_value(Field::Url, url.as_str().into());
    }
    if let Some(kind) = &detail.kind {
        record.set_value(Field::Type, kind.as_str().into());
    }
    if let Some(ruler) = detail.ruler.first().and_then(|r| r.name.as_deref()) {
        record.set_value(Field::Ruler, ruler.into());
    }
    if let Some(shape) = &detail.shape {
        record.set_value(Field::Shape, shape.as_str().into());
    }
    if let Some(text) = detail.composition.as_ref().and_then(|c| c.text.as_deref()) {
        let (material, fineness) = split_composition(text);
        if let Some(fineness) = fineness {
            record.set_value(Field::Fineness, fineness.into());
        }
        record.set_value(Field::Material, material.into());
    }
    if let Some(weight) = &detail.weight {
        record.set_value(Field::Weight, FieldValue::from_json(weight));
    }
    if let Some(size) = &detail.size {
        record.set_value(Field::Diameter, FieldValue::from_json(size));
    }
    if let Some(thickness) = &detail.thickness {
        record.set_value(Field::Thickness, FieldValue::from_json(thickness));
    }
    if let Some(orientation) = &detail.orientation {
        record.set_value(Field::ObvRev, orientation.as_str().into());
    }
    if let Some(mint) = detail.mints.first().and_then(|m| m.name.as_deref()) {
        record.set_value(Field::Mint, mint.into());
    }
    if let Some(range) = emission_range(detail.min_year, detail.max_year) {
        record.set_value(Field::DateEmis, range.into());
    }
    for (field, number) in catalog_numbers(&detail.references) {
        record.set_value(field, number.into());
    }

    if let Some(obverse) = &detail.obverse {
        map_side(record, obverse, Some(Field::ObverseDesigner), Field::ObverseDesign);
    }
    if let Some(reverse) = &detail.reverse {
        map_side(record, reverse, Some(Field::ReverseDesigner), Field::ReverseDesign);
    }
    if let Some(edge) = &detail.edge {
        map_side(record, edge, None, Field::Edge);
    }
}

fn map_side<R: RecordSink + ?Sized>(
    record: &mut R,
    side: &CoinSide,
    designer_field: Option<Field>,
    design_field: Field,
) {
    if let (Some(field), Some(engravers)) = (designer_field, &side.engravers) {
        record.set_value(field, engravers.join(", ").into());
    }
    if let Some(description) = &side.description {
        record.set_value(design_field, description.as_str().into());
    }
}

/// Image fields to fill and the picture URL for each, obverse first.
pub fn picture_targets(detail: &ItemDetail) -> Vec<(Field, &str)> {
    [
        (Field::ObverseImg, &detail.obverse),
        (Field::ReverseImg, &detail.reverse),
        (Field::EdgeImg, &detail.edge),
    ]
    .into_iter()
    .filter_map(|(field, side)| {
        side.as_ref()
            .and_then(|s| s.picture.as_deref())
            .map(|url| (field, url))
    })
    .collect()
}

/// Split `"Silver (.925)"` into `("Silver", Some("925"))`.
///
/// Text without a `(.<digits>)` annotation comes back unchanged.
pub fn split_composition(text: &str) -> (String, Option<String>) {
    if let Some(pos) = text.find("(.") {
        let inner = &text[pos + 2..];
        let digits = inner.split(')').next().unwrap_or_default().trim();
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return (text[..pos].trim().to_string(), Some(digits.to_string()));
        }
    }
    (text.to_string(), None)
}

/// `"<min> - <max>"` when the coin was issued over more than one year.
pub fn emission_range(min_year: Option<i64>, max_year: Option<i64>) -> Option<String> {
    match (min_year, max_year) {
        (Some(min), Some(max)) if min != max => Some(format!("{} - {}", min, max)),
        _ => None,
    }
}

/// First four references as `"<catalogue code># <number>"`, paired with
/// their numbered field.
///
/// A reference missing its code or number leaves its own field unset; the
/// following references keep their positions.
pub fn catalog_numbers(references: &[CatalogReference]) -> Vec<(Field, String)> {
    Field::CATALOG_NUMBERS
        .iter()
        .zip(references.iter().take(MAX_CATALOG_NUMBERS))
        .filter_map(|(field, r)| {
            let code = r.catalogue.as_ref()?.code.as_deref()?;
            let number = r.number.as_deref()?;
            Some((*field, format!("{}# {}", code, number)))
        })
        .collect()
}
