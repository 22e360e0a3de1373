//! Extraction instruction and structured-output schema.
//!
//! The instruction text is the extraction policy: one line item per
//! document, name taken from the file, grand total, quantity/unit-price
//! rules, the two category labels, and empty remarks. Unit tests pin the
//! rules so a wording change cannot silently drop one.

use crate::output::{MATERIALS_LABEL, REFRESHMENTS_LABEL};
use serde_json::{json, Value};

/// Build the instruction for one document.
///
/// `display_name` is the filename without extension; the model is told to
/// copy it verbatim into `name`.
pub fn extraction_instruction(display_name: &str) -> String {
    format!(
        r#"Analyze this invoice/receipt.

TASK: Create a SINGLE expense line item for this document.

STRICT RULES:
1. **Name**: MUST be exactly "{display_name}". Do NOT use the product name from the receipt text.
2. **Total Amount**: Extract the final total sum of the invoice.
3. **Quantity**:
   - If the receipt is for multiple identical units (e.g., 5 trophies), extract that count (5).
   - If the receipt contains mixed items or a service, set Quantity to 1.
4. **Unit Price**: Calculate as (Total Amount / Quantity).
5. **Category**: Classify broadly into one of these two categories:
   - "{MATERIALS_LABEL}" (Materials): For physical items, prizes, trophies, decorations, office supplies, equipment, hardware, gifts, etc.
   - "{REFRESHMENTS_LABEL}" (Tea Break): For all food, drinks, snacks, meals, catering, fruits, etc.
   - If it doesn't fit "{REFRESHMENTS_LABEL}", default to "{MATERIALS_LABEL}".
6. **Remarks**: Return an empty string ("").

Return the result as JSON."#
    )
}

/// Response schema in the Gemini `responseSchema` dialect (OpenAPI subset).
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "A title for the group"
            },
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": {
                            "type": "STRING",
                            "description": format!("Category of the item (Use '{MATERIALS_LABEL}' or '{REFRESHMENTS_LABEL}')")
                        },
                        "name": {
                            "type": "STRING",
                            "description": "Name of the item (Must exactly match the provided filename)"
                        },
                        "quantity": {
                            "type": "NUMBER",
                            "description": "Quantity of items (1 if mixed or unspecified)"
                        },
                        "unitPrice": {
                            "type": "NUMBER",
                            "description": "Price per unit"
                        },
                        "totalAmount": {
                            "type": "NUMBER",
                            "description": "Total cost for this line item"
                        },
                        "remarks": {
                            "type": "STRING",
                            "description": "Must be an empty string"
                        }
                    },
                    "required": ["name", "quantity", "unitPrice", "totalAmount"]
                }
            }
        }
    })
}

/// Suffix for providers without a native schema parameter.
pub fn schema_suffix(schema: &Value) -> String {
    format!(
        "\n\nRespond with a single JSON object only, no prose and no code fences, \
matching this schema:\n{}",
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_embeds_display_name_verbatim() {
        let p = extraction_instruction("2024-05 奖杯 发票");
        assert!(p.contains(r#"MUST be exactly "2024-05 奖杯 发票""#));
    }

    #[test]
    fn instruction_carries_every_rule() {
        let p = extraction_instruction("x");
        assert!(p.contains("SINGLE expense line item"));
        assert!(p.contains("final total sum"));
        assert!(p.contains("set Quantity to 1"));
        assert!(p.contains("(Total Amount / Quantity)"));
        assert!(p.contains(MATERIALS_LABEL));
        assert!(p.contains(REFRESHMENTS_LABEL));
        assert!(p.contains(r#"default to "物料""#));
        assert!(p.contains(r#"Return an empty string ("")"#));
    }

    #[test]
    fn schema_requires_core_fields() {
        let schema = response_schema();
        let required = &schema["properties"]["items"]["items"]["required"];
        let names: Vec<&str> = required
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(names, ["name", "quantity", "unitPrice", "totalAmount"]);
    }

    #[test]
    fn schema_suffix_embeds_schema() {
        let s = schema_suffix(&response_schema());
        assert!(s.contains("\"totalAmount\""));
    }
}
