//! One-time passcode challenges.
//!
//! An account holds at most one live challenge (`otp` + `otp_expires_at`).
//! Issuing overwrites whatever was there; a successful check clears both
//! fields. Every function takes `now` explicitly so the state transitions can
//! be exercised without a clock.

use rand::{rngs::OsRng, Rng};
use time::{Duration, OffsetDateTime};

use crate::accounts::Account;
use crate::config::OtpConfig;

pub const CODE_LEN: usize = 6;

#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub max_attempts: i32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            max_attempts: 5,
        }
    }
}

impl From<&OtpConfig> for OtpPolicy {
    fn from(cfg: &OtpConfig) -> Self {
        Self {
            ttl: Duration::seconds(cfg.ttl_seconds),
            max_attempts: cfg.max_attempts.max(1),
        }
    }
}

/// Why a submitted code was refused. Callers collapse all of these into
/// one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoChallenge,
    Expired,
    Mismatch,
    /// Mismatch that used up the last attempt; the challenge is gone.
    Exhausted,
}

pub fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{n:0width$}", width = CODE_LEN)
}

/// Puts a fresh challenge on the account and returns the code to deliver.
/// The attempt budget starts over with each challenge.
pub fn issue_challenge(account: &mut Account, policy: &OtpPolicy, now: OffsetDateTime) -> String {
    let code = generate_code();
    account.otp = Some(code.clone());
    account.otp_expires_at = Some(now + policy.ttl);
    account.failed_otp_attempts = 0;
    code
}

fn codes_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Checks `submitted` against the live challenge.
///
/// On success the challenge is cleared, the account is marked verified and
/// `last_login_at` is stamped. A wrong code bumps the attempt counter and
/// burns the challenge once the policy limit is reached. Expired or missing
/// challenges leave the account untouched.
pub fn verify_challenge(
    account: &mut Account,
    submitted: &str,
    policy: &OtpPolicy,
    now: OffsetDateTime,
) -> Result<(), Rejection> {
    let (Some(code), Some(expires_at)) = (account.otp.as_deref(), account.otp_expires_at) else {
        return Err(Rejection::NoChallenge);
    };
    if now >= expires_at {
        return Err(Rejection::Expired);
    }
    if !codes_match(code, submitted) {
        account.failed_otp_attempts += 1;
        if account.failed_otp_attempts >= policy.max_attempts {
            clear_challenge(account);
            return Err(Rejection::Exhausted);
        }
        return Err(Rejection::Mismatch);
    }

    clear_challenge(account);
    account.is_verified = true;
    account.last_login_at = Some(now);
    Ok(())
}

fn clear_challenge(account: &mut Account) {
    account.otp = None;
    account.otp_expires_at = None;
    account.failed_otp_attempts = 0;
}
