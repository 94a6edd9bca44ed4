//! Invoice record with the ten extracted fields.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// One of the ten extracted invoice fields, in export column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceField {
    VendorName,
    InvoiceNumber,
    InvoiceDate,
    DueDate,
    PoNumber,
    TotalAmount,
    Description,
    BillTo,
    PaymentTerms,
    PaymentInstructions,
}

impl InvoiceField {
    /// All fields in the fixed column order.
    pub const ALL: [InvoiceField; 10] = [
        InvoiceField::VendorName,
        InvoiceField::InvoiceNumber,
        InvoiceField::InvoiceDate,
        InvoiceField::DueDate,
        InvoiceField::PoNumber,
        InvoiceField::TotalAmount,
        InvoiceField::Description,
        InvoiceField::BillTo,
        InvoiceField::PaymentTerms,
        InvoiceField::PaymentInstructions,
    ];

    /// Column header and console label.
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceField::VendorName => "Vendor Name",
            InvoiceField::InvoiceNumber => "Invoice Number",
            InvoiceField::InvoiceDate => "Invoice Date",
            InvoiceField::DueDate => "Due Date",
            InvoiceField::PoNumber => "PO Number",
            InvoiceField::TotalAmount => "Total Amount",
            InvoiceField::Description => "Description",
            InvoiceField::BillTo => "Bill To",
            InvoiceField::PaymentTerms => "Payment Terms",
            InvoiceField::PaymentInstructions => "Payment Instructions",
        }
    }

    /// Normalized JSON keys accepted for this field, best match first.
    ///
    /// The first entry is always the normalized label.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            InvoiceField::VendorName => &["vendor_name", "vendor"],
            InvoiceField::InvoiceNumber => &[
                "invoice_number",
                "invoice_no",
                "invoice",
                "invoice_id",
            ],
            InvoiceField::InvoiceDate => &["invoice_date", "date", "issue_date"],
            InvoiceField::DueDate => &["due_date"],
            InvoiceField::PoNumber => &["po_number", "po", "purchase_order", "purchase_order_number"],
            InvoiceField::TotalAmount => &["total_amount", "total", "amount_due", "amount"],
            InvoiceField::Description => &[
                "description",
                "description_of_services_goods",
                "description_of_services",
            ],
            InvoiceField::BillTo => &["bill_to", "bill_to_property_name", "property_name"],
            InvoiceField::PaymentTerms => &["payment_terms", "terms"],
            InvoiceField::PaymentInstructions => &[
                "payment_instructions",
                "remit_to_payment_instructions",
                "remit_to",
            ],
        }
    }

    /// Resolve a JSON key such as `"Vendor Name"` or `"invoice_number"`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::match_key(key).map(|(field, _)| field)
    }

    /// Resolve a JSON key with its alias rank; 0 is an exact label match.
    fn match_key(key: &str) -> Option<(Self, usize)> {
        let normalized = normalize_key(key);
        Self::ALL.into_iter().find_map(|field| {
            field
                .aliases()
                .iter()
                .position(|alias| *alias == normalized)
                .map(|rank| (field, rank))
        })
    }
}

/// Lowercase and collapse every run of non-alphanumeric characters to `_`.
fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut pending_sep = false;
    for c in key.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Convert a JSON value into a field value; absent for null, blank or nested.
fn value_to_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// An invoice as returned by an extraction backend.
///
/// Records are never edited after creation; deduplication only filters them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceRecord {
    values: [Option<String>; 10],
}

impl InvoiceRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Blank values are stored as absent.
    pub fn with(mut self, field: InvoiceField, value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        self.values[field as usize] = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Build a record from a JSON object.
    ///
    /// Returns `None` when the object holds no recognized, non-empty field.
    pub fn from_json_object(object: &Map<String, Value>) -> Option<Self> {
        let mut record = Self::new();
        let mut ranks = [usize::MAX; 10];
        for (key, value) in object {
            let Some((field, rank)) = InvoiceField::match_key(key) else {
                continue;
            };
            let Some(value) = value_to_field(value) else {
                continue;
            };
            // Map order is alphabetical, so collisions go by alias rank.
            if rank < ranks[field as usize] {
                ranks[field as usize] = rank;
                record.values[field as usize] = Some(value);
            }
        }

        if record.is_empty() { None } else { Some(record) }
    }

    /// Get a field value.
    pub fn get(&self, field: InvoiceField) -> Option<&str> {
        self.values[field as usize].as_deref()
    }

    /// Vendor name.
    pub fn vendor_name(&self) -> Option<&str> {
        self.get(InvoiceField::VendorName)
    }

    /// Invoice number.
    pub fn invoice_number(&self) -> Option<&str> {
        self.get(InvoiceField::InvoiceNumber)
    }

    /// Whether every field is absent.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Number of populated fields.
    pub fn populated_fields(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Row values in column order; absent fields become empty cells.
    pub fn row(&self) -> Vec<&str> {
        self.values
            .iter()
            .map(|v| v.as_deref().unwrap_or(""))
            .collect()
    }

    /// Deduplication identity: trimmed, lowercased (vendor, invoice number).
    ///
    /// `None` when either part is missing.
    pub fn identity_key(&self) -> Option<(String, String)> {
        let vendor = self.vendor_name()?.trim().to_lowercase();
        let number = self.invoice_number()?.trim().to_lowercase();
        if vendor.is_empty() || number.is_empty() {
            return None;
        }
        Some((vendor, number))
    }

    /// Format as a console block: one `Label: value` line per present field.
    pub fn format_block(&self) -> String {
        let mut output = String::new();
        for field in InvoiceField::ALL {
            if let Some(value) = self.get(field) {
                output.push_str(&format!("  {}: {}\n", field.label(), value));
            }
        }
        output
    }
}

impl Serialize for InvoiceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(InvoiceField::ALL.len()))?;
        for field in InvoiceField::ALL {
            map.serialize_entry(field.label(), &self.get(field))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_key_normalization() {
        assert_eq!(normalize_key("Vendor Name"), "vendor_name");
        assert_eq!(normalize_key("  Remit To / Payment Instructions "), "remit_to_payment_instructions");
        assert_eq!(normalize_key("Invoice #"), "invoice");
        assert_eq!(normalize_key("PO-Number"), "po_number");
    }

    #[test]
    fn test_field_from_key() {
        assert_eq!(InvoiceField::from_key("Vendor Name"), Some(InvoiceField::VendorName));
        assert_eq!(InvoiceField::from_key("invoice_number"), Some(InvoiceField::InvoiceNumber));
        assert_eq!(InvoiceField::from_key("Invoice No."), Some(InvoiceField::InvoiceNumber));
        assert_eq!(
            InvoiceField::from_key("Description of Services/Goods"),
            Some(InvoiceField::Description)
        );
        assert_eq!(
            InvoiceField::from_key("Bill To / Property Name"),
            Some(InvoiceField::BillTo)
        );
        assert_eq!(InvoiceField::from_key("Tax ID"), None);
    }

    #[test]
    fn test_from_json_object_mixed_values() {
        let value = json!({
            "Vendor Name": " Acme Corp ",
            "Invoice Number": "INV-001",
            "Total Amount": 1250.5,
            "Due Date": "",
            "PO Number": null,
            "Description": ["nested"],
            "Unrelated": "ignored"
        });
        let record = InvoiceRecord::from_json_object(value.as_object().unwrap()).unwrap();

        assert_eq!(record.vendor_name(), Some("Acme Corp"));
        assert_eq!(record.invoice_number(), Some("INV-001"));
        assert_eq!(record.get(InvoiceField::TotalAmount), Some("1250.5"));
        assert_eq!(record.get(InvoiceField::DueDate), None);
        assert_eq!(record.get(InvoiceField::PoNumber), None);
        assert_eq!(record.get(InvoiceField::Description), None);
        assert_eq!(record.populated_fields(), 3);
    }

    #[test]
    fn test_exact_label_beats_loose_alias() {
        let value = json!({
            "Total Amount": "120.00",
            "Amount": "100.00",
            "Invoice Date": "2024-01-01",
            "Date": "2024-01-05",
            "Terms": "Net 15",
            "Payment Terms": "Net 30"
        });
        let record = InvoiceRecord::from_json_object(value.as_object().unwrap()).unwrap();

        assert_eq!(record.get(InvoiceField::TotalAmount), Some("120.00"));
        assert_eq!(record.get(InvoiceField::InvoiceDate), Some("2024-01-01"));
        assert_eq!(record.get(InvoiceField::PaymentTerms), Some("Net 30"));
    }

    #[test]
    fn test_alias_fills_blank_label() {
        let value = json!({ "Total Amount": "", "Amount Due": "75.00", "total": "80.00" });
        let record = InvoiceRecord::from_json_object(value.as_object().unwrap()).unwrap();

        assert_eq!(record.get(InvoiceField::TotalAmount), Some("80.00"));
    }

    #[test]
    fn test_from_json_object_without_fields() {
        let value = json!({ "note": "no invoices here", "Vendor Name": null });
        assert!(InvoiceRecord::from_json_object(value.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_identity_key_is_trimmed_and_case_insensitive() {
        let a = InvoiceRecord::new()
            .with(InvoiceField::VendorName, "ACME Corp")
            .with(InvoiceField::InvoiceNumber, "inv-001 ");
        let b = InvoiceRecord::new()
            .with(InvoiceField::VendorName, "  acme corp")
            .with(InvoiceField::InvoiceNumber, "INV-001");
        assert_eq!(a.identity_key(), b.identity_key());

        let missing = InvoiceRecord::new().with(InvoiceField::VendorName, "Acme Corp");
        assert_eq!(missing.identity_key(), None);
    }

    #[test]
    fn test_row_has_fixed_order_and_empty_cells() {
        let record = InvoiceRecord::new()
            .with(InvoiceField::PaymentInstructions, "Wire to 123")
            .with(InvoiceField::VendorName, "Acme Corp");
        let row = record.row();
        assert_eq!(row.len(), 10);
        assert_eq!(row[0], "Acme Corp");
        assert_eq!(row[1], "");
        assert_eq!(row[9], "Wire to 123");
    }

    #[test]
    fn test_serialize_uses_labels() {
        let record = InvoiceRecord::new().with(InvoiceField::InvoiceNumber, "INV-9");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["Invoice Number"], json!("INV-9"));
        assert_eq!(value["Vendor Name"], Value::Null);
    }

    #[test]
    fn test_format_block_skips_absent_fields() {
        let record = InvoiceRecord::new()
            .with(InvoiceField::VendorName, "Acme Corp")
            .with(InvoiceField::TotalAmount, "$10.00");
        assert_eq!(
            record.format_block(),
            "  Vendor Name: Acme Corp\n  Total Amount: $10.00\n"
        );
    }
}
