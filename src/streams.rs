//! Stream definitions
//!
//! The fixed, ordered list of streams the tap can replicate. Order matters:
//! resumption after an interrupted run restarts from the stream recorded in
//! `currently_syncing` and continues down this list.

use crate::engine::{StreamDefinition, StreamFilter, Strategy};
use crate::format::Formatter;

const UPDATED_DATE: Option<&str> = Some("UpdatedDateUTC");

const fn paginated(
    tap_stream_id: &'static str,
    pk_fields: &'static [&'static str],
    formatter: Option<Formatter>,
) -> StreamDefinition {
    StreamDefinition {
        tap_stream_id,
        pk_fields,
        bookmark_key: UPDATED_DATE,
        strategy: Strategy::Paginated { filter: None },
        formatter,
    }
}

const fn bookmarked(
    tap_stream_id: &'static str,
    pk_fields: &'static [&'static str],
    bookmark_key: &'static str,
    formatter: Option<Formatter>,
) -> StreamDefinition {
    StreamDefinition {
        tap_stream_id,
        pk_fields,
        bookmark_key: Some(bookmark_key),
        strategy: Strategy::Bookmarked,
        formatter,
    }
}

const fn everything(
    tap_stream_id: &'static str,
    pk_fields: &'static [&'static str],
    formatter: Option<Formatter>,
) -> StreamDefinition {
    StreamDefinition {
        tap_stream_id,
        pk_fields,
        bookmark_key: None,
        strategy: Strategy::Everything,
        formatter,
    }
}

static ALL_STREAMS: [StreamDefinition; 26] = [
    // Paged, ordered, and filtered by modification time
    paginated("bank_transactions", &["BankTransactionID"], None),
    StreamDefinition {
        tap_stream_id: "contacts",
        pk_fields: &["ContactID"],
        bookmark_key: UPDATED_DATE,
        strategy: Strategy::Paginated {
            filter: Some(StreamFilter::ArchivedContacts),
        },
        formatter: Some(Formatter::Contacts),
    },
    paginated("quotes", &["QuoteID"], None),
    paginated("credit_notes", &["CreditNoteID"], Some(Formatter::CreditNotes)),
    paginated("invoices", &["InvoiceID"], Some(Formatter::Invoices)),
    paginated("manual_journals", &["ManualJournalID"], None),
    paginated("overpayments", &["OverpaymentID"], Some(Formatter::OverPrePayments)),
    paginated("payments", &["PaymentID"], Some(Formatter::Payments)),
    paginated("prepayments", &["PrepaymentID"], Some(Formatter::OverPrePayments)),
    paginated("purchase_orders", &["PurchaseOrderID"], None),
    // Offset by journal number
    StreamDefinition {
        tap_stream_id: "journals",
        pk_fields: &["JournalID"],
        bookmark_key: Some("JournalNumber"),
        strategy: Strategy::Journal,
        formatter: Some(Formatter::Journals),
    },
    // Unpaged, filtered by modification time
    bookmarked("accounts", &["AccountID"], "UpdatedDateUTC", None),
    bookmarked("bank_transfers", &["BankTransferID"], "CreatedDateUTC", None),
    bookmarked("employees", &["EmployeeID"], "UpdatedDateUTC", None),
    bookmarked("expense_claims", &["ExpenseClaimID"], "UpdatedDateUTC", None),
    bookmarked("items", &["ItemID"], "UpdatedDateUTC", None),
    bookmarked("receipts", &["ReceiptID"], "UpdatedDateUTC", Some(Formatter::Receipts)),
    bookmarked("users", &["UserID"], "UpdatedDateUTC", Some(Formatter::Users)),
    // Unpaged and unfiltered
    everything("branding_themes", &["BrandingThemeID"], None),
    everything("contact_groups", &["ContactGroupID"], Some(Formatter::ContactGroups)),
    everything("currencies", &["Code"], None),
    everything("organisations", &["OrganisationID"], None),
    everything("repeating_invoices", &["RepeatingInvoiceID"], None),
    everything("tax_rates", &["TaxType"], None),
    everything("tracking_categories", &["TrackingCategoryID"], None),
    // Paged without a modification filter
    StreamDefinition {
        tap_stream_id: "linked_transactions",
        pk_fields: &["LinkedTransactionID"],
        bookmark_key: UPDATED_DATE,
        strategy: Strategy::LinkedTransactions,
        formatter: None,
    },
];

/// Every stream, in sync order
pub fn all_streams() -> &'static [StreamDefinition] {
    &ALL_STREAMS
}

/// Every stream id, in sync order
pub fn all_stream_ids() -> Vec<&'static str> {
    ALL_STREAMS.iter().map(|s| s.tap_stream_id).collect()
}

/// Look up a stream definition by id
pub fn find_stream(tap_stream_id: &str) -> Option<&'static StreamDefinition> {
    ALL_STREAMS.iter().find(|s| s.tap_stream_id == tap_stream_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReplicationMethod;
    use std::collections::HashSet;

    #[test]
    fn test_stream_ids_are_unique() {
        let ids = all_stream_ids();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_order_starts_with_paginated_and_ends_with_linked() {
        let ids = all_stream_ids();
        assert_eq!(ids.first(), Some(&"bank_transactions"));
        assert_eq!(ids.last(), Some(&"linked_transactions"));
        assert_eq!(ids.iter().position(|id| *id == "journals"), Some(10));
    }

    #[test]
    fn test_full_table_streams_have_no_bookmark() {
        for stream in all_streams() {
            let full_table = stream.replication_method() == ReplicationMethod::FullTable;
            assert_eq!(full_table, stream.bookmark_key.is_none(), "{}", stream.tap_stream_id);
        }
    }

    #[test]
    fn test_find_stream() {
        let contacts = find_stream("contacts").unwrap();
        assert_eq!(
            contacts.strategy,
            Strategy::Paginated {
                filter: Some(StreamFilter::ArchivedContacts)
            }
        );
        assert_eq!(contacts.formatter, Some(Formatter::Contacts));

        let transfers = find_stream("bank_transfers").unwrap();
        assert_eq!(transfers.bookmark_key, Some("CreatedDateUTC"));
        assert_eq!(transfers.bookmark_properties(), vec!["CreatedDateUTC"]);

        assert!(find_stream("assets").is_none());
    }
}
