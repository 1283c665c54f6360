//! Data model: merchants, transactions, products, providers, discounts, and
//! the funding audit log.

mod common;
mod discount;
mod funding;
mod merchant;
mod product;
mod provider;
mod transaction;

pub use common::*;
pub use discount::*;
pub use funding::*;
pub use merchant::*;
pub use product::*;
pub use provider::*;
pub use transaction::*;
