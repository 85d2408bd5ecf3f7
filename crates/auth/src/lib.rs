//! Conversation authentication.
//!
//! A conversation is either bound to a user (a [`Session`] exists) or is
//! somewhere in the login dialogue `welcome → email → password`. The
//! [`Authenticator`] owns both and resolves identities through the injected
//! [`tally_service_traits::IdentityStore`].

pub mod authenticator;
pub mod error;
pub mod login;
pub mod session;
pub mod validate;

pub use {
    authenticator::{AuthStatus, Authenticator, LoginReply, prompts},
    error::{Error, Result},
    login::{LoginProcess, LoginStep},
    session::{Session, SessionRegistry},
};
