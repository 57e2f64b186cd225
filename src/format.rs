//! Record formatters
//!
//! Per-entity cleanup applied to a page before emission. Formatters only
//! delete or correct fields; they never add data.

use crate::types::{JsonValue, Record};

/// .NET `DateTime.MinValue` after date normalization
const MIN_DATE: &str = "0001-01-01T00:00:00Z";

/// Nested collections that make invoices self-referential
const NESTED_INVOICE_COLLECTIONS: [&str; 4] =
    ["Prepayments", "Payments", "CreditNotes", "Overpayments"];

/// Invoice date fields the API fills with `DateTime.MinValue` when unset
const OPTIONAL_INVOICE_DATES: [&str; 4] = [
    "DueDate",
    "ExpectedPaymentDate",
    "PlannedPaymentDate",
    "FullyPaidOnDate",
];

/// Stream-specific page transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// Drop payments, prune allocation invoices
    CreditNotes,
    /// Drop group membership lists
    ContactGroups,
    /// Strip warnings and format nested contact groups
    Contacts,
    /// Strip warnings, prune nested collections, clear unset dates
    Invoices,
    /// Clear unset journal dates
    Journals,
    /// Prune allocation invoices
    OverPrePayments,
    /// Prune the paid invoice
    Payments,
    /// Strip warnings from the receipt, its user and its contact
    Receipts,
    /// Strip warnings
    Users,
}

impl Formatter {
    /// Apply this formatter to every record of a page
    pub fn apply(self, records: &mut [Record]) {
        match self {
            Self::CreditNotes => format_credit_notes(records),
            Self::ContactGroups => format_contact_groups(records),
            Self::Contacts => format_contacts(records),
            Self::Invoices => format_invoices(records),
            Self::Journals => format_journals(records),
            Self::OverPrePayments => format_over_pre_payments(records),
            Self::Payments => format_payments(records),
            Self::Receipts => format_receipts(records),
            Self::Users => strip_warnings(records),
        }
    }
}

fn format_nested_invoice(invoice: &mut Record) {
    for key in NESTED_INVOICE_COLLECTIONS {
        invoice.shift_remove(key);
    }
}

fn format_allocations(record: &mut Record) {
    let Some(JsonValue::Array(allocations)) = record.get_mut("Allocations") else {
        return;
    };
    for allocation in allocations {
        if let Some(JsonValue::Object(invoice)) = allocation.get_mut("Invoice") {
            format_nested_invoice(invoice);
        }
    }
}

fn remove_nested_warnings(record: &mut Record, key: &str) {
    if let Some(JsonValue::Object(nested)) = record.get_mut(key) {
        nested.shift_remove("Warnings");
    }
}

fn clear_min_dates(record: &mut Record, fields: &[&str]) {
    for field in fields {
        if record.get(*field).and_then(JsonValue::as_str) == Some(MIN_DATE) {
            record.shift_remove(*field);
        }
    }
}

/// Remove `Warnings` from every record
pub fn strip_warnings(records: &mut [Record]) {
    for record in records {
        record.shift_remove("Warnings");
    }
}

/// Credit notes: drop `Payments`, prune allocation invoices
pub fn format_credit_notes(records: &mut [Record]) {
    for record in records {
        record.shift_remove("Payments");
        format_allocations(record);
    }
}

/// Contact groups: drop the member list
pub fn format_contact_groups(records: &mut [Record]) {
    for record in records {
        record.shift_remove("Contacts");
    }
}

/// Payments: prune the nested invoice
pub fn format_payments(records: &mut [Record]) {
    for record in records {
        if let Some(JsonValue::Object(invoice)) = record.get_mut("Invoice") {
            format_nested_invoice(invoice);
        }
    }
}

/// Overpayments and prepayments: prune allocation invoices
pub fn format_over_pre_payments(records: &mut [Record]) {
    for record in records {
        format_allocations(record);
    }
}

/// Receipts: strip warnings here and on the nested user and contact
pub fn format_receipts(records: &mut [Record]) {
    strip_warnings(records);
    for record in records {
        remove_nested_warnings(record, "User");
        remove_nested_warnings(record, "Contact");
    }
}

/// Contacts: strip warnings and format the nested contact groups
pub fn format_contacts(records: &mut [Record]) {
    strip_warnings(records);
    for record in records {
        let Some(JsonValue::Array(groups)) = record.get_mut("ContactGroups") else {
            continue;
        };
        for group in groups.iter_mut().filter_map(JsonValue::as_object_mut) {
            group.shift_remove("Contacts");
        }
    }
}

/// Invoices: strip warnings, prune nested payment collections, clear unset dates
pub fn format_invoices(records: &mut [Record]) {
    strip_warnings(records);
    for record in records {
        format_payment_collections(record);
        clear_min_dates(record, &OPTIONAL_INVOICE_DATES);
    }
}

/// Journals: clear `DateTime.MinValue` journal dates
pub fn format_journals(records: &mut [Record]) {
    for record in records {
        clear_min_dates(record, &["JournalDate"]);
    }
}

fn format_payment_collections(invoice: &mut Record) {
    for key in NESTED_INVOICE_COLLECTIONS {
        let Some(JsonValue::Array(items)) = invoice.get_mut(key) else {
            continue;
        };
        for item in items.iter_mut().filter_map(JsonValue::as_object_mut) {
            if let Some(JsonValue::Object(nested)) = item.get_mut("Invoice") {
                format_nested_invoice(nested);
            }
            format_allocations(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn page(value: JsonValue) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn to_value(records: Vec<Record>) -> JsonValue {
        JsonValue::Array(records.into_iter().map(JsonValue::Object).collect())
    }

    #[test]
    fn test_format_credit_notes() {
        let mut records = page(json!([{
            "CreditNoteID": "cn-1",
            "Payments": [{"PaymentID": "p-1"}],
            "Allocations": [{
                "Amount": 10,
                "Invoice": {
                    "InvoiceID": "inv-1",
                    "Payments": [],
                    "CreditNotes": [],
                    "Prepayments": [],
                    "Overpayments": [],
                    "InvoiceNumber": "INV-1"
                }
            }]
        }]));

        Formatter::CreditNotes.apply(&mut records);

        assert_eq!(
            to_value(records),
            json!([{
                "CreditNoteID": "cn-1",
                "Allocations": [{
                    "Amount": 10,
                    "Invoice": {"InvoiceID": "inv-1", "InvoiceNumber": "INV-1"}
                }]
            }])
        );
    }

    #[test]
    fn test_format_payments_prunes_invoice() {
        let mut records = page(json!([
            {"PaymentID": "p-1", "Invoice": {"InvoiceID": "i", "Payments": [{"PaymentID": "p-1"}]}},
            {"PaymentID": "p-2"}
        ]));

        Formatter::Payments.apply(&mut records);

        assert_eq!(
            to_value(records),
            json!([
                {"PaymentID": "p-1", "Invoice": {"InvoiceID": "i"}},
                {"PaymentID": "p-2"}
            ])
        );
    }

    #[test]
    fn test_format_over_pre_payments_without_allocations() {
        let mut records = page(json!([{"OverpaymentID": "o-1", "Total": 5}]));
        Formatter::OverPrePayments.apply(&mut records);
        assert_eq!(to_value(records), json!([{"OverpaymentID": "o-1", "Total": 5}]));
    }

    #[test]
    fn test_format_receipts_strips_nested_warnings() {
        let mut records = page(json!([{
            "ReceiptID": "r-1",
            "Warnings": ["w"],
            "User": {"UserID": "u", "Warnings": ["w"]},
            "Contact": {"ContactID": "c", "Warnings": ["w"]}
        }]));

        Formatter::Receipts.apply(&mut records);

        assert_eq!(
            to_value(records),
            json!([{
                "ReceiptID": "r-1",
                "User": {"UserID": "u"},
                "Contact": {"ContactID": "c"}
            }])
        );
    }

    #[test]
    fn test_format_contacts() {
        let mut records = page(json!([
            {
                "ContactID": "c-1",
                "Warnings": ["w"],
                "ContactGroups": [{"ContactGroupID": "g", "Contacts": [{"ContactID": "c-1"}]}]
            },
            {"ContactID": "c-2"}
        ]));

        Formatter::Contacts.apply(&mut records);

        assert_eq!(
            to_value(records),
            json!([
                {"ContactID": "c-1", "ContactGroups": [{"ContactGroupID": "g"}]},
                {"ContactID": "c-2"}
            ])
        );
    }

    #[test]
    fn test_format_users_and_contact_groups() {
        let mut users = page(json!([{"UserID": "u", "Warnings": []}]));
        Formatter::Users.apply(&mut users);
        assert_eq!(to_value(users), json!([{"UserID": "u"}]));

        let mut groups = page(json!([{"ContactGroupID": "g", "Contacts": []}]));
        Formatter::ContactGroups.apply(&mut groups);
        assert_eq!(to_value(groups), json!([{"ContactGroupID": "g"}]));
    }

    #[test]
    fn test_format_invoices() {
        let mut records = page(json!([{
            "InvoiceID": "i-1",
            "Warnings": ["w"],
            "DueDate": "0001-01-01T00:00:00Z",
            "FullyPaidOnDate": "2021-03-01T00:00:00Z",
            "Payments": [{"PaymentID": "p", "Invoice": {"InvoiceID": "i-1", "Payments": []}}],
            "CreditNotes": [{
                "CreditNoteID": "cn",
                "Allocations": [{"Invoice": {"InvoiceID": "i-1", "CreditNotes": []}}]
            }]
        }]));

        Formatter::Invoices.apply(&mut records);

        assert_eq!(
            to_value(records),
            json!([{
                "InvoiceID": "i-1",
                "FullyPaidOnDate": "2021-03-01T00:00:00Z",
                "Payments": [{"PaymentID": "p", "Invoice": {"InvoiceID": "i-1"}}],
                "CreditNotes": [{
                    "CreditNoteID": "cn",
                    "Allocations": [{"Invoice": {"InvoiceID": "i-1"}}]
                }]
            }])
        );
    }

    #[test]
    fn test_format_journals_clears_min_date() {
        let mut records = page(json!([
            {"JournalID": "j-1", "JournalDate": "0001-01-01T00:00:00Z"},
            {"JournalID": "j-2", "JournalDate": "2021-01-01T00:00:00Z"}
        ]));

        Formatter::Journals.apply(&mut records);

        assert_eq!(
            to_value(records),
            json!([
                {"JournalID": "j-1"},
                {"JournalID": "j-2", "JournalDate": "2021-01-01T00:00:00Z"}
            ])
        );
    }
}
