//! ACME client invocation and the renewal schedule

pub mod acme_client;
pub mod renewal;

pub use acme_client::{AcmeClient, IssueRequest};
pub use renewal::RenewalScheduler;
