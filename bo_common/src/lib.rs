mod cents;
mod helpers;

pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, BASIS_POINTS_SCALE, DEFAULT_CURRENCY_CODE};
pub use helpers::{parse_boolean_flag, parse_env_number};
pub use secret::Secret;
