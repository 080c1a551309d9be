//! Tabular and structured serialization of catalog records.

use crate::error::{PricingError, PricingResult};
use crate::models::{PriceDimension, PriceRecord, UnitPrice};

const FIXED_COLUMNS: [&str; 15] = [
    "sku",
    "productFamily",
    "termType",
    "offerTermCode",
    "effectiveDate",
    "leaseContractLength",
    "offeringClass",
    "purchaseOption",
    "rateCode",
    "description",
    "unit",
    "beginRange",
    "endRange",
    "currency",
    "pricePerUnit",
];

/// One CSV row per (record, dimension, currency); attribute columns follow the fixed ones.
///
/// A record without dimensions still gets a row, with empty price columns.
pub fn to_csv<'a, I>(records: I, attribute_names: &[&str]) -> PricingResult<String>
where
    I: IntoIterator<Item = &'a PriceRecord>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = FIXED_COLUMNS.iter().chain(attribute_names.iter());
    writer.write_record(header).map_err(export_error)?;

    for record in records {
        if record.price_dimensions.is_empty() {
            write_row(&mut writer, record, None, None, attribute_names)?;
            continue;
        }

        for dimension in &record.price_dimensions {
            if dimension.price_per_unit.is_empty() {
                write_row(&mut writer, record, Some(dimension), None, attribute_names)?;
            }
            for price in &dimension.price_per_unit {
                write_row(&mut writer, record, Some(dimension), Some(price), attribute_names)?;
            }
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PricingError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PricingError::Export(e.to_string()))
}

/// One JSON object per line
pub fn to_json_lines<'a, I>(records: I) -> PricingResult<String>
where
    I: IntoIterator<Item = &'a PriceRecord>,
{
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(record).map_err(|e| PricingError::Export(e.to_string()))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

fn write_row(
    writer: &mut csv::Writer<Vec<u8>>,
    record: &PriceRecord,
    dimension: Option<&PriceDimension>,
    price: Option<&UnitPrice>,
    attribute_names: &[&str],
) -> PricingResult<()> {
    let term = record.term.as_ref();
    let reserved = term.and_then(|t| t.reserved.as_ref());
    let text = |value: Option<&String>| value.map(String::as_str).unwrap_or_default().to_string();

    let mut row = vec![
        record.sku.clone(),
        text(record.product_family.as_ref()),
        term.map(|t| t.term_type.to_string()).unwrap_or_default(),
        term.map(|t| t.offer_term_code.clone()).unwrap_or_default(),
        text(term.and_then(|t| t.effective_date.as_ref())),
        text(reserved.and_then(|r| r.lease_contract_length.as_ref())),
        text(reserved.and_then(|r| r.offering_class.as_ref())),
        text(reserved.and_then(|r| r.purchase_option.as_ref())),
        dimension.map(|d| d.rate_code.clone()).unwrap_or_default(),
        text(dimension.and_then(|d| d.description.as_ref())),
        text(dimension.and_then(|d| d.unit.as_ref())),
        text(dimension.and_then(|d| d.begin_range.as_ref())),
        text(dimension.and_then(|d| d.end_range.as_ref())),
        price.map(|p| p.currency.clone()).unwrap_or_default(),
        price.map(|p| p.amount.to_string()).unwrap_or_default(),
    ];
    row.extend(
        attribute_names
            .iter()
            .map(|name| record.attribute(name).unwrap_or_default().to_string()),
    );

    writer.write_record(&row).map_err(export_error)
}

fn export_error(err: csv::Error) -> PricingError {
    PricingError::Export(err.to_string())
}
