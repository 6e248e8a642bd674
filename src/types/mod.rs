//! Core domain types shared across the gateway.

pub mod model;
pub mod request;
pub mod response;

pub use model::{ComplexityTier, ModelDescriptor, ProviderKind};
pub use request::{AskRequest, ConversationTurn, GradeLevel, Subject, Tier};
pub use response::{AskResponse, ResponseSource};
