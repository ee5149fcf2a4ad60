//! FIM Guide Logic - loan dashboard core shared by the front ends
//!
//! Borrowers and lenders see the same loan from opposite sides. This library
//! turns the backend's loan snapshots into what each side should be told,
//! and wraps every backend read and write behind one trait.
//!
//! Key components:
//! - Loan snapshot data contract and the adapter that normalizes backend JSON
//! - Loan status message derivation and the "Coming up" panel
//! - Past-due breakdown totals and amount/date formatting
//! - Payment confirmation upload, review and comment rules
//! - Email reminder settings
//! - Explicit session, configuration, logging
//! - REST backend client (`LoanBackend` trait) and dashboard orchestration

pub mod adapter;
pub mod client;
pub mod coming_up;
pub mod config;
pub mod confirm;
pub mod dashboard;
pub mod due_history;
pub mod format;
pub mod loan_message;
pub mod logging;
pub mod notification;
pub mod payment;
pub mod session;
pub mod types;
pub mod verification;
