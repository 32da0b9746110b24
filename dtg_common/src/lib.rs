pub mod helpers;
mod money;
mod secret;

pub use money::{CurrencyCode, Money, MoneyError, PLACEHOLDER_CURRENCY};
pub use secret::Secret;
