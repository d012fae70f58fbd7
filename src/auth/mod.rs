pub mod authorizor;
mod requester;
mod token;

pub use requester::Requester;
pub use token::{TokenClaims, TokenVerifier, TOKEN_LIFETIME_SECONDS};
