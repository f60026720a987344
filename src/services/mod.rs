pub mod hashing;
pub mod security;
pub mod token;
pub mod totp;
