pub mod admission;
pub mod context;
pub mod link_service;

pub use admission::{AdmissionGate, AdmissionLimiter};
pub use context::{AppContext, HttpSettings};
pub use link_service::{
    CachedTarget, CreateOutcome, CreateRequest, LinkService, PipelineSettings, Resolution, Tier,
};
