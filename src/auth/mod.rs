//! Request authentication (C6) and the legacy JWT issuance endpoint (A5).
//!
//! Two independent authentication paths exist side by side, per
//! `DESIGN.md`'s Open Question #2: the HMAC authenticator in
//! [`authenticator`] gates every vend/requery/listing endpoint, while
//! [`legacy_jwt`] only issues a token for the one legacy endpoint that
//! asks for it — a JWT is never itself accepted as a credential anywhere
//! in this crate.

pub mod authenticator;
pub mod legacy_jwt;

pub use authenticator::{authenticate, require_auth, AuthContext, AuthState};
