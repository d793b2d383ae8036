//! Sales and purchase documents and the poster that applies them to the ledgers.

pub mod poster;
pub mod types;

pub use poster::{
    DocumentPoster, JournalTotals, PlannedEntry, PostingAccounts, PostingOptions, PostingOutcome,
};
pub use types::{
    Document, DocumentFilter, DocumentKind, DocumentLine, DocumentLineInput, DocumentStatus,
    DocumentUpdate, MAX_DOCUMENT_NUMBER_LEN, NewDocument, build_lines,
};
