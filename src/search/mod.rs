pub mod sign_op;
pub use sign_op::*;

pub mod token;
pub use token::*;

pub mod expr_group;
pub use expr_group::*;

pub mod identifier_macros;
pub use identifier_macros::*;

pub mod filter_error;
pub use filter_error::*;

pub mod search_filter;
pub use search_filter::*;

pub mod sort_field;
pub use sort_field::*;

pub mod search_provider;
pub use search_provider::*;

#[cfg(test)]
mod _tests;
