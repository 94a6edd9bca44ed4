//! Extraction prompt sent with every chunk.

use crate::models::invoice::InvoiceField;

const SYSTEM_MESSAGE: &str =
    "You are an expert at extracting structured data from invoices. Always return valid JSON.";

/// Chat prompt: fixed system message plus extraction instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// System message.
    pub system: String,
    /// Instructions placed before the chunk text.
    pub instructions: String,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Prompt {
    /// The invoice extraction prompt.
    pub fn invoice_extraction(temperature: f64) -> Self {
        Self {
            system: SYSTEM_MESSAGE.to_string(),
            instructions: extraction_instructions(),
            temperature,
        }
    }

    /// User message for one chunk.
    pub fn user_message(&self, text: &str) -> String {
        format!("{}\n\nDocument Text:\n{}", self.instructions, text)
    }
}

fn extraction_instructions() -> String {
    let mut out = String::from(
        "Analyze this document fragment, which may contain one or more invoices \
         or only part of one. Extract all invoice data and return it as a JSON array \
         with one object per invoice.\n\nFor each invoice, extract these fields:\n",
    );
    for field in InvoiceField::ALL {
        out.push_str("- ");
        out.push_str(field.label());
        out.push('\n');
    }

    out.push_str(
        "\nUse exactly these field names as keys. Use an empty string for a field \
         that is not present. If the fragment contains no invoice data, return [].\n\
         Return ONLY valid JSON in this format:\n[\n  {\n",
    );
    let example = InvoiceField::ALL
        .iter()
        .map(|field| format!("    \"{}\": \"...\"", field.label()))
        .collect::<Vec<_>>()
        .join(",\n");
    out.push_str(&example);
    out.push_str("\n  }\n]");
    out
}
