//! Phone OTP sign-in, bearer sessions and role rules
//!
//! Tokens and codes are random, shown to the client once, and stored only
//! as SHA-256 hashes.

pub mod sender;
pub mod service;
pub mod token;

pub use sender::{LogSender, MemorySender, OtpSender, SendError, WebhookSender};
pub use service::{authenticate, send_otp, verify_otp, AuthError, AuthSettings, SignIn};
pub use token::{generate_otp, generate_session_token, hash_secret};
