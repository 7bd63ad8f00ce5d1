//! Single-use capability tokens for follow-up actions.

pub mod otp;

pub use otp::{Redemption, TokenVault, VaultError};
