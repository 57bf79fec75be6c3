//! Template Variables
//!
//! Ordered value maps, the fixed set of system-provided ("standard") variables,
//! and the preparer that derives them from project, company and contact records.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

use crate::config::GeneratorConfig;
use crate::document_number::DocumentCode;

/// Variables every project can supply regardless of template.
pub const STANDARD_VARIABLES: &[&str] = &[
    "project_name",
    "company_name",
    "contact_name",
    "price",
    "price_before_tax",
    "tax_amount",
    "date",
    "year",
    "month",
    "day",
    "roc_year",
    "roc_date",
    "document_number",
    "quotation_number",
    "contract_number",
    "invoice_number",
    "contact_info",
    "contact_email",
    "contact_phone",
    "company_address",
    "created_at",
    "updated_at",
];

pub fn is_standard(name: &str) -> bool {
    STANDARD_VARIABLES.contains(&name)
}

/// Insertion-ordered map from variable name to substitution text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMap {
    entries: Vec<(String, String)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Overlay `other`; its values win on shared keys.
    pub fn merge(&mut self, other: &ValueMap) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ValueMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl Serialize for ValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ValueMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ValueMapVisitor)
    }
}

struct ValueMapVisitor;

impl<'de> Visitor<'de> for ValueMapVisitor {
    type Value = ValueMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of variable names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ValueMap, A::Error> {
        let mut map = ValueMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, stringify(value));
        }
        Ok(map)
    }
}

/// Boundary coercion for non-string JSON values.
fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A number or numeric string; `null` and blank strings read as zero.
fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = stringify(Value::deserialize(deserializer)?);
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse()
        .map_err(|_| serde::de::Error::custom(format!("invalid amount: {raw:?}")))
}

/// Discovered names split against [`STANDARD_VARIABLES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCategories {
    pub standard: Vec<String>,
    pub extra: Vec<String>,
    pub all: Vec<String>,
}

pub fn categorize<'a, I>(names: I) -> VariableCategories
where
    I: IntoIterator<Item = &'a str>,
{
    let all: BTreeSet<&str> = names.into_iter().collect();
    let (standard, extra): (Vec<&str>, Vec<&str>) = all.iter().copied().partition(|n| is_standard(n));

    VariableCategories {
        standard: standard.into_iter().map(String::from).collect(),
        extra: extra.into_iter().map(String::from).collect(),
        all: all.into_iter().map(String::from).collect(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default)]
    pub project_name: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// Tax-inclusive price. Numeric strings are accepted.
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRecord {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// The project's document date, or `today` when it is missing or malformed.
pub fn project_date(project: &ProjectRecord, today: NaiveDate) -> NaiveDate {
    match NaiveDate::parse_from_str(&project.date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            warn!(
                project = %project.project_name,
                date = %project.date,
                fallback = %today,
                "unparseable project date, using today"
            );
            today
        }
    }
}

pub fn prepare_standard_variables(
    project: &ProjectRecord,
    company: &CompanyRecord,
    contact: &ContactRecord,
    date: NaiveDate,
    document_number: &DocumentCode,
    config: &GeneratorConfig,
    now: DateTime<Utc>,
) -> ValueMap {
    let price = project.price;
    let price_before_tax = price / (1.0 + config.tax_rate);
    let tax_amount = price - price_before_tax;

    let roc_year = date.year() - config.calendar_offset;
    let month = format!("{:02}", date.month());
    let day = format!("{:02}", date.day());

    let contact_info = if contact.phone.is_empty() {
        contact.contact_name.clone()
    } else {
        format!("{} ({})", contact.contact_name, contact.phone)
    };

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let number = document_number.as_str();

    let mut values = ValueMap::new();
    values.insert("project_name", project.project_name.as_str());
    values.insert("company_name", company.company_name.as_str());
    values.insert("contact_name", contact.contact_name.as_str());

    values.insert("price", format_amount(price));
    values.insert("price_before_tax", format_amount(price_before_tax));
    values.insert("tax_amount", format_amount(tax_amount));

    values.insert("date", date.format("%Y-%m-%d").to_string());
    values.insert("year", date.year().to_string());
    values.insert("month", month.as_str());
    values.insert("day", day.as_str());

    values.insert("roc_year", roc_year.to_string());
    values.insert("roc_date", format!("{roc_year}/{month}/{day}"));

    values.insert("document_number", number);
    values.insert("quotation_number", number);
    values.insert("contract_number", number);
    values.insert("invoice_number", number);

    values.insert("contact_info", contact_info);
    values.insert("contact_email", contact.email.as_str());
    values.insert("contact_phone", contact.phone.as_str());
    values.insert("company_address", company.address.as_str());

    values.insert("created_at", timestamp.as_str());
    values.insert("updated_at", timestamp);

    values
}

/// Two decimals with comma thousands separators: `1234567.891` -> `1,234,567.89`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
