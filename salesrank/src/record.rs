//! Row types flowing through the pipeline and the parsers for the two text
//! formats the stages read.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
    ops::Add,
};

use serde::{Deserialize, Serialize};

use crate::error::MalformedRecordError;

pub const CSV_HEADER: &str = "transaction_id,product_id,category,price,quantity";

const TRANSACTION_FIELDS: usize = 5;
const CATEGORY_FIELD: usize = 2;
const PRICE_FIELD: usize = 3;
const QUANTITY_FIELD: usize = 4;

/// Number of tab separated fields in an intermediate row.
pub const TOTAL_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub category: String,
    pub unit_price: f64,
    pub quantity: i64,
}

impl TransactionRecord {
    pub fn revenue(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Header,
    Record(TransactionRecord),
}

/// Parses one line of the sales log.
///
/// Any line starting with [`CSV_HEADER`] is reported as [`ParsedLine::Header`].
/// Every other line must have exactly five comma separated fields, not
/// counting trailing empty ones, with a decimal price and an integer quantity.
pub fn parse_line(line: &str) -> Result<ParsedLine, MalformedRecordError> {
    if line.starts_with(CSV_HEADER) {
        return Ok(ParsedLine::Header);
    }

    let mut fields: Vec<&str> = line.split(',').collect();
    while fields.len() > 1 && fields.last() == Some(&"") {
        fields.pop();
    }
    if fields.len() != TRANSACTION_FIELDS {
        return Err(MalformedRecordError::FieldCount {
            expected: TRANSACTION_FIELDS,
            found: fields.len(),
        });
    }

    let price = fields[PRICE_FIELD];
    let unit_price = price
        .trim()
        .parse::<f64>()
        .map_err(|source| MalformedRecordError::Price {
            value: price.to_string(),
            source,
        })?;

    let quantity = fields[QUANTITY_FIELD];
    let quantity = quantity
        .parse::<i64>()
        .map_err(|source| MalformedRecordError::Quantity {
            value: quantity.to_string(),
            source,
        })?;

    Ok(ParsedLine::Record(TransactionRecord {
        category: fields[CATEGORY_FIELD].to_string(),
        unit_price,
        quantity,
    }))
}

/// Running revenue/quantity pair folded per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueQuantity {
    pub revenue: f64,
    pub quantity: i64,
}

impl From<&TransactionRecord> for RevenueQuantity {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            revenue: record.revenue(),
            quantity: record.quantity,
        }
    }
}

impl Add for RevenueQuantity {
    type Output = RevenueQuantity;

    fn add(self, rhs: Self) -> Self::Output {
        RevenueQuantity {
            revenue: self.revenue + rhs.revenue,
            quantity: self.quantity.wrapping_add(rhs.quantity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total_revenue: f64,
    pub total_quantity: i64,
}

impl CategoryTotal {
    pub fn new(category: String, totals: RevenueQuantity) -> Self {
        Self {
            category,
            total_revenue: totals.revenue,
            total_quantity: totals.quantity,
        }
    }

    /// Intermediate store row fields. Revenue uses the shortest decimal that
    /// reads back to the same `f64`.
    pub fn to_fields(&self) -> [String; TOTAL_FIELDS] {
        [
            self.category.clone(),
            self.total_revenue.to_string(),
            self.total_quantity.to_string(),
        ]
    }

    /// Reads back a row produced by [`CategoryTotal::to_fields`].
    ///
    /// Returns `Ok(None)` when the row doesn't have exactly three fields;
    /// those rows are skipped by the ranking stage.
    pub fn from_fields<'a, I>(fields: I) -> Result<Option<Self>, MalformedRecordError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fields: Vec<&str> = fields.into_iter().collect();
        if fields.len() != TOTAL_FIELDS {
            return Ok(None);
        }
        let total_revenue =
            fields[1]
                .trim()
                .parse::<f64>()
                .map_err(|source| MalformedRecordError::Revenue {
                    value: fields[1].to_string(),
                    source,
                })?;
        let total_quantity =
            fields[2]
                .parse::<i64>()
                .map_err(|source| MalformedRecordError::Quantity {
                    value: fields[2].to_string(),
                    source,
                })?;
        Ok(Some(CategoryTotal {
            category: fields[0].to_string(),
            total_revenue,
            total_quantity,
        }))
    }
}

/// Ranking key. Equality and hashing go through the bit pattern so they agree
/// with the `total_cmp` ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Revenue(pub f64);

impl PartialEq for Revenue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Revenue {}

impl Hash for Revenue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Revenue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Revenue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// What travels with a revenue key through the ranking shuffle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankPayload {
    pub category: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub category: String,
    pub total_revenue: f64,
    pub total_quantity: i64,
}

impl RankedRow {
    pub fn to_fields(&self) -> [String; 3] {
        [
            self.category.clone(),
            format_revenue(self.total_revenue),
            self.total_quantity.to_string(),
        ]
    }
}

/// Two decimal places, rounding half up on the shortest decimal that reads
/// back to `value`. So `2.675` gives `2.68`, not the `2.67` its binary value
/// would round to.
pub fn format_revenue(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}Infinity");
    }

    let shortest = value.abs().to_string();
    let (int_part, frac_part) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(2))
        .map(|b| b - b'0')
        .collect();

    if frac_part.as_bytes().get(2).map_or(false, |d| *d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let point = digits.len() - 2;
    let mut out = String::with_capacity(digits.len() + 2);
    if value.is_sign_negative() {
        out.push('-');
    }
    for (i, d) in digits.iter().enumerate() {
        if i == point {
            out.push('.');
        }
        out.push(char::from(b'0' + d));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> TransactionRecord {
        match parse_line(line).unwrap() {
            ParsedLine::Record(r) => r,
            ParsedLine::Header => panic!("{line} parsed as header"),
        }
    }

    #[test]
    fn header_is_skipped() {
        assert_eq!(parse_line(CSV_HEADER).unwrap(), ParsedLine::Header);
    }

    #[test]
    fn parses_data_row() {
        let r = record("A,p1,Electronics,100.00,2");
        assert_eq!(r.category, "Electronics");
        assert_eq!(r.unit_price, 100.0);
        assert_eq!(r.quantity, 2);
        assert_eq!(r.revenue(), 200.0);
    }

    #[test]
    fn category_is_kept_verbatim() {
        assert_eq!(record("A,p1, Home & Garden ,1,1").category, " Home & Garden ");
    }

    #[test]
    fn wrong_field_count_is_fatal() {
        assert_eq!(
            parse_line("A,p1,Toys,10.00").unwrap_err(),
            MalformedRecordError::FieldCount {
                expected: 5,
                found: 4
            }
        );
        assert!(matches!(
            parse_line("A,p1,Toys,10.00,5,extra"),
            Err(MalformedRecordError::FieldCount { found: 6, .. })
        ));
        assert!(matches!(
            parse_line(""),
            Err(MalformedRecordError::FieldCount { found: 1, .. })
        ));
    }

    #[test]
    fn trailing_empty_fields_are_dropped() {
        let r = record("A,p1,Toys,10.00,5,");
        assert_eq!(r.category, "Toys");
        assert_eq!(r.quantity, 5);
        assert_eq!(record("A,p1,Toys,10.00,5,,").quantity, 5);

        assert!(matches!(
            parse_line("A,p1,Toys,10.00,"),
            Err(MalformedRecordError::FieldCount { found: 4, .. })
        ));
    }

    #[test]
    fn bad_numbers_are_fatal() {
        assert!(matches!(
            parse_line("A,p1,Toys,ten,5"),
            Err(MalformedRecordError::Price { .. })
        ));
        assert!(matches!(
            parse_line("A,p1,Toys,10.00,5.5"),
            Err(MalformedRecordError::Quantity { .. })
        ));
        assert!(matches!(
            parse_line("A,p1,Toys,,5"),
            Err(MalformedRecordError::Price { .. })
        ));
    }

    #[test]
    fn header_prefix_wins_over_field_count() {
        let line = format!("{CSV_HEADER},extra");
        assert_eq!(parse_line(&line).unwrap(), ParsedLine::Header);
    }

    #[test]
    fn revenue_quantity_adds() {
        let a = RevenueQuantity {
            revenue: 200.0,
            quantity: 2,
        };
        let b = RevenueQuantity {
            revenue: 50.0,
            quantity: 1,
        };
        assert_eq!(
            a + b,
            RevenueQuantity {
                revenue: 250.0,
                quantity: 3
            }
        );
        assert_eq!(RevenueQuantity::default() + a, a);
    }

    #[test]
    fn category_total_reads_back() {
        let total = CategoryTotal {
            category: "Toys".to_string(),
            total_revenue: 0.1 + 0.2,
            total_quantity: 7,
        };
        let fields = total.to_fields();
        let back = CategoryTotal::from_fields(fields.iter().map(String::as_str))
            .unwrap()
            .unwrap();
        assert_eq!(back, total);
    }

    #[test]
    fn short_intermediate_rows_are_skipped() {
        assert_eq!(CategoryTotal::from_fields(["Toys", "1.0"]).unwrap(), None);
        assert!(matches!(
            CategoryTotal::from_fields(["Toys", "lots", "1"]),
            Err(MalformedRecordError::Revenue { .. })
        ));
    }

    #[test]
    fn ranked_row_uses_two_decimals() {
        let row = RankedRow {
            category: "Toys".to_string(),
            total_revenue: 50.0,
            total_quantity: 5,
        };
        assert_eq!(row.to_fields(), ["Toys", "50.00", "5"]);
    }

    #[test]
    fn revenue_ties_round_half_up() {
        let cases = [
            (0.125, "0.13"),
            (2.675, "2.68"),
            (1.005, "1.01"),
            (0.124, "0.12"),
            (9.995, "10.00"),
            (99.999, "100.00"),
            (250.0, "250.00"),
            (0.5, "0.50"),
            (0.0, "0.00"),
            (-2.675, "-2.68"),
            (0.1 + 0.2, "0.30"),
        ];
        for (value, expected) in cases {
            assert_eq!(format_revenue(value), expected, "{value}");
        }

        let row = RankedRow {
            category: "Toys".to_string(),
            total_revenue: 2.675,
            total_quantity: 1,
        };
        assert_eq!(row.to_fields()[1], "2.68");
    }

    #[test]
    fn revenue_key_orders_totally() {
        let mut keys = vec![Revenue(3.0), Revenue(f64::NAN), Revenue(-1.0), Revenue(10.5)];
        keys.sort();
        assert_eq!(keys[0], Revenue(-1.0));
        assert_eq!(keys[2], Revenue(10.5));
        assert!(keys[3].0.is_nan());
    }
}
