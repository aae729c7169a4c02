pub mod config;
pub mod domain;
pub mod errors;

pub use domain::customer::{
    Customer, CustomerDraft, CustomerFields, CustomerId, MemberNumberInput,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
