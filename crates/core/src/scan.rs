use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Caller-supplied context for one scan, entered by the operator alongside
/// the photo. Pass-through data: the pipeline never inspects it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub operator_name: String,
    pub operator_code: String,
    pub issued_to_name: String,
    pub issued_to_code: String,
    pub product_variant: String,
    pub sku: String,
    /// Manual manufacturing date, used when the pipeline found none or the
    /// operator overrides the voted one.
    #[serde(default)]
    pub manual_date: Option<String>,
}

impl ScanMetadata {
    /// The date that goes into the audit trail: operator override first,
    /// otherwise the pipeline's voted date.
    pub fn effective_date<'a>(&'a self, voted: &'a str) -> &'a str {
        match self.manual_date.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => voted,
        }
    }
}

/// One appended audit row. Column order is the spreadsheet contract:
/// timestamp, operator name/code, issued-to name/code, product variant,
/// SKU, manufacturing date, dot code, image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow(Vec<String>);

impl AuditRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn into_cells(self) -> Vec<String> {
        self.0
    }
}

/// Build the audit rows for one scan: exactly one row per code, with the
/// chosen date duplicated across all of them.
pub fn audit_rows(
    meta: &ScanMetadata,
    codes: &[String],
    date: &str,
    scanned_at: DateTime<Local>,
    image_ref: &str,
) -> Vec<AuditRow> {
    let timestamp = scanned_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let date = meta.effective_date(date);
    codes
        .iter()
        .map(|code| {
            AuditRow(vec![
                timestamp.clone(),
                meta.operator_name.clone(),
                meta.operator_code.clone(),
                meta.issued_to_name.clone(),
                meta.issued_to_code.clone(),
                meta.product_variant.clone(),
                meta.sku.clone(),
                date.to_string(),
                code.clone(),
                image_ref.to_string(),
            ])
        })
        .collect()
}
