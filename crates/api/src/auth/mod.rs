//! Access-token handling. Tokens are issued by the identity provider; this
//! server only validates them.

pub mod jwt;
