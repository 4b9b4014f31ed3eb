//! Funding-request service integration.

pub mod gateway;
pub mod types;

pub use gateway::{select_candidates, HttpRequestService, RequestService};
pub use types::{Candidate, FundingRequest, RequestResult, RequestServiceError, RequestStatus};
