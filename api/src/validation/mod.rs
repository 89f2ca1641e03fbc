//! Input validation for write endpoints.
//!
//! Request structs here are authored independently of the storage schema:
//! each write operation has its own type with explicit `sanitize` and
//! `validate` steps, wired in through the `ValidatedJson` extractor. A
//! storage-layer change can therefore never silently loosen or tighten
//! what the API accepts.

mod extractors;
mod requests;
mod sanitizers;
mod validators;

pub use extractors::{FieldError, Validatable, ValidatedJson, ValidationBuilder};
pub use requests::{CreateStakingPositionRequest, CreateUserRequest, CreateWalletRequest};
