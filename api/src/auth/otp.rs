//! One-time verification codes.
//!
//! Codes are six random digits, stored in the session until verification
//! overwrites or clears them — there is no expiry and no attempt limit,
//! and [`FALLBACK_CODE`] is accepted regardless of what was issued. The
//! "email" carrying the code is simulated: it is delivered to the user as
//! a notification.

use rand::Rng;

use crate::notify::Notification;

/// Demo bypass code, accepted unconditionally.
pub const FALLBACK_CODE: &str = "123456";

/// Issue a fresh six-digit code.
pub fn issue() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Whether a submitted code passes against the stored one.
pub fn accept(submitted: &str, stored: Option<&str>) -> bool {
    stored == Some(submitted) || submitted == FALLBACK_CODE
}

/// The simulated verification email, delivered as a notification.
pub fn announcement(email: &str, code: &str) -> Notification {
    Notification::info(
        &format!("Verification Code: {code}"),
        &format!("In a real app, this would be sent to {email}. For testing, use code: {FALLBACK_CODE}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_is_six_digits() {
        for _ in 0..50 {
            let code = issue();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_accept_matches_stored_code() {
        assert!(accept("482913", Some("482913")));
        assert!(!accept("000000", Some("482913")));
        assert!(!accept("482913", None));
    }

    #[test]
    fn test_fallback_is_always_accepted() {
        assert!(accept(FALLBACK_CODE, Some("482913")));
        assert!(accept(FALLBACK_CODE, None));
    }
}
