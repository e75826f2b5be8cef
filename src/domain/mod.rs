//! Domain models for SchoolID.
//!
//! Tenants and their ID settings, counter keys, and API contracts.

pub mod counter;
pub mod dto;
pub mod format;
pub mod tenant;

pub use counter::{CounterKey, CounterState};
pub use dto::{
    ApiResponse, CounterRequest, CounterResponse, GenerateQuery, GeneratedIdsResponse,
    ListTenantQuery, ListTenantResponse, TenantSummary,
};
pub use format::{IdFormat, MAX_ID_LENGTH};
pub use tenant::{
    GLOBAL_SETTINGS_KEY, MAX_TENANT_ID_LEN, TenantProfile, TenantRef, TenantSettings, is_reserved_name,
};
