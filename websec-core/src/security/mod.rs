/// Security primitives shared by the token and header layers

pub mod compare;
pub mod validation;

pub use compare::{compare, compare_str};
pub use validation::{validate_header_name, validate_input, validate_token_prefix, ValidationError};
