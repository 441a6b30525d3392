//! Chat content filtering.
//!
//! Every chat message passes through [`screen_message`] before it is stored.
//! Messages that openly try to move payment off the platform are blocked
//! outright; everything else is delivered with phone numbers, payment handles,
//! e-mail addresses, payment vocabulary and payment links redacted.
//!
//! The filter is a pure text transform. It keeps no state between messages.

use regex::{Captures, Regex, RegexSet};
use serde::Serialize;
use std::sync::LazyLock;

const PHONE_REDACTED: &str = "[PHONE REDACTED]";
const HANDLE_REDACTED: &str = "[UPI ID REDACTED]";
const EMAIL_REDACTED: &str = "[EMAIL REDACTED]";
const PAYMENT_REDACTED: &str = "[PAYMENT INFO REDACTED]";
const LINK_REDACTED: &str = "[PAYMENT LINK REDACTED]";

/// Phrases that name a way to pay outside the platform.
const PAYMENT_KEYWORDS: &[&str] = &[
    "paytm",
    "phonepe",
    "gpay",
    "googlepay",
    "google pay",
    "whatsapp pay",
    "bank account",
    "account number",
    "ifsc",
    "qr code",
    "scan and pay",
    "scan code",
    "payment link",
    "pay me",
    "send money",
    "transfer money",
    "direct payment",
    "cash payment",
    "offline payment",
];

/// Substrings that mark a URL as a payment link.
const PAYMENT_URL_MARKERS: &[&str] = &["pay", "payment", "upi", "wallet"];

// Patterns are compile-time constants; a failure here is a programming error.
#[allow(clippy::expect_used)]
static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // bare 10 digits
        r"\b\d{10}\b",
        // 3-3-4 with optional separators
        r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b",
        // international prefix
        r"\+\d{1,3}[-.\s]?\d{10}\b",
        // 5+5 grouping
        r"\b\d{5}[-.\s]?\d{5}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid phone pattern"))
    .collect()
});

#[allow(clippy::expect_used)]
static HANDLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[\w.-]+@[\w-]+(?:\.[\w-]+)*\b").expect("invalid handle pattern")
});

#[allow(clippy::expect_used)]
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("invalid email pattern")
});

#[allow(clippy::expect_used)]
static WHOLE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("invalid email pattern")
});

#[allow(clippy::expect_used)]
static KEYWORD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PAYMENT_KEYWORDS
        .iter()
        .map(|k| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k))).expect("invalid keyword pattern")
        })
        .collect()
});

#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("invalid url pattern"));

#[allow(clippy::expect_used)]
static BLOCK_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)pay.*outside.*platform",
        r"(?i)direct.*payment",
        r"(?i)bypass.*commission",
        r"(?i)avoid.*fee",
        r"(?i)save.*commission",
    ])
    .expect("invalid block pattern")
});

/// Result of redacting one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFilterResult {
    /// Text with every redaction applied
    pub filtered: String,
    /// Whether any pass changed the text
    pub is_filtered: bool,
    /// The text as sent
    pub original: String,
}

/// Decision for a message about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    /// Do not store or deliver the message at all
    Blocked,
    /// Store and deliver the (possibly redacted) message
    Deliver(ChatFilterResult),
}

/// Runs the block check and, if the message may be delivered, the redaction
/// passes.
#[must_use]
pub fn screen_message(message: &str) -> Screening {
    if should_block_message(message) {
        Screening::Blocked
    } else {
        Screening::Deliver(filter_sensitive_info(message))
    }
}

/// Whether the message states an intent to pay around the platform.
#[must_use]
pub fn should_block_message(message: &str) -> bool {
    BLOCK_PATTERNS.is_match(message)
}

/// Applies every redaction pass in order. Passes are cumulative: each one runs
/// on the output of the previous.
#[must_use]
pub fn filter_sensitive_info(message: &str) -> ChatFilterResult {
    let mut filtered = message.to_string();
    let mut is_filtered = false;

    for pattern in PHONE_PATTERNS.iter() {
        is_filtered |= replace_all(&mut filtered, pattern, PHONE_REDACTED);
    }

    is_filtered |= redact_payment_handles(&mut filtered);
    is_filtered |= replace_all(&mut filtered, &EMAIL_PATTERN, EMAIL_REDACTED);

    for pattern in KEYWORD_PATTERNS.iter() {
        is_filtered |= replace_all(&mut filtered, pattern, PAYMENT_REDACTED);
    }

    is_filtered |= redact_payment_links(&mut filtered);

    ChatFilterResult {
        filtered,
        is_filtered,
        original: message.to_string(),
    }
}

fn replace_all(text: &mut String, pattern: &Regex, replacement: &str) -> bool {
    if !pattern.is_match(text.as_str()) {
        return false;
    }
    *text = pattern.replace_all(text.as_str(), replacement).into_owned();
    true
}

/// Redacts `name@provider` handles. A match that is a well-formed e-mail
/// address is left for the e-mail pass; any other `x@y` is a handle.
fn redact_payment_handles(text: &mut String) -> bool {
    let mut hit = false;
    let replaced = HANDLE_PATTERN.replace_all(text.as_str(), |caps: &Captures<'_>| {
        if WHOLE_EMAIL.is_match(&caps[0]) {
            caps[0].to_string()
        } else {
            hit = true;
            HANDLE_REDACTED.to_string()
        }
    });
    if hit {
        *text = replaced.into_owned();
    }
    hit
}

fn redact_payment_links(text: &mut String) -> bool {
    let mut hit = false;
    let replaced = URL_PATTERN.replace_all(text.as_str(), |caps: &Captures<'_>| {
        let url = caps[0].to_ascii_lowercase();
        if PAYMENT_URL_MARKERS.iter().any(|m| url.contains(m)) {
            hit = true;
            LINK_REDACTED.to_string()
        } else {
            caps[0].to_string()
        }
    });
    if hit {
        *text = replaced.into_owned();
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_phone_number_redacted() {
        let result = filter_sensitive_info("Call me at 9876543210");
        assert!(result.is_filtered);
        assert_eq!(result.filtered, "Call me at [PHONE REDACTED]");
        assert_eq!(result.original, "Call me at 9876543210");
    }

    #[test]
    fn test_formatted_phone_numbers_redacted() {
        for text in [
            "ring 987-654-3210 tonight",
            "ring 987 654 3210 tonight",
            "ring 987.654.3210 tonight",
            "ring 98765 43210 tonight",
        ] {
            let result = filter_sensitive_info(text);
            assert!(result.is_filtered, "{text}");
            assert_eq!(result.filtered, "ring [PHONE REDACTED] tonight", "{text}");
        }
    }

    #[test]
    fn test_international_phone_redacted() {
        let result = filter_sensitive_info("whatsapp +44-1234567890");
        assert!(result.is_filtered);
        assert!(!result.filtered.contains("1234567890"));
    }

    #[test]
    fn test_payment_keyword_redacted() {
        let result = filter_sensitive_info("let's use paytm");
        assert!(result.is_filtered);
        assert_eq!(result.filtered, "let's use [PAYMENT INFO REDACTED]");
    }

    #[test]
    fn test_keywords_are_case_insensitive_whole_words() {
        let result = filter_sensitive_info("Send my IFSC and Google Pay details");
        assert_eq!(
            result.filtered,
            "Send my [PAYMENT INFO REDACTED] and [PAYMENT INFO REDACTED] details"
        );

        // "gpayments" is not the word "gpay"
        let untouched = filter_sensitive_info("gpayments team");
        assert!(!untouched.is_filtered);
    }

    #[test]
    fn test_domain_mention_left_alone() {
        let result = filter_sensitive_info("check example.com");
        assert!(!result.is_filtered);
        assert_eq!(result.filtered, "check example.com");
    }

    #[test]
    fn test_upi_handle_redacted() {
        let result = filter_sensitive_info("my id is ravi.k@okaxis");
        assert!(result.is_filtered);
        assert_eq!(result.filtered, "my id is [UPI ID REDACTED]");
    }

    #[test]
    fn test_dotted_handle_that_is_not_an_email_redacted() {
        let result = filter_sensitive_info("pay to ravi@ok.axis1");
        assert!(result.is_filtered);
        assert_eq!(result.filtered, "pay to [UPI ID REDACTED]");

        let result = filter_sensitive_info("send to raj@ybl.x");
        assert!(result.is_filtered);
        assert_eq!(result.filtered, "send to [UPI ID REDACTED]");
    }

    #[test]
    fn test_email_redacted() {
        let result = filter_sensitive_info("mail ravi@example.com please");
        assert!(result.is_filtered);
        assert_eq!(result.filtered, "mail [EMAIL REDACTED] please");
    }

    #[test]
    fn test_payment_url_redacted_plain_url_kept() {
        let result = filter_sensitive_info("see https://shop.test/checkout?mode=wallet");
        assert_eq!(result.filtered, "see [PAYMENT LINK REDACTED]");

        let kept = filter_sensitive_info("docs at https://docs.rs/regex");
        assert!(!kept.is_filtered);
    }

    #[test]
    fn test_passes_are_cumulative() {
        let result = filter_sensitive_info("pay me on 9876543210 or raj@ybl");
        assert_eq!(
            result.filtered,
            "[PAYMENT INFO REDACTED] on [PHONE REDACTED] or [UPI ID REDACTED]"
        );
    }

    #[test]
    fn test_clean_message_untouched() {
        let result = filter_sensitive_info("great work, thanks!");
        assert!(!result.is_filtered);
        assert_eq!(result.filtered, result.original);
    }

    #[test]
    fn test_block_detects_circumvention() {
        assert!(should_block_message(
            "let's pay outside the platform to avoid fee"
        ));
        assert!(should_block_message("We can BYPASS the commission"));
        assert!(should_block_message("direct payment is easier"));
        assert!(should_block_message("this will save you commission"));
        assert!(!should_block_message("great work, thanks!"));
    }

    #[test]
    fn test_screen_blocks_before_redacting() {
        assert_eq!(
            screen_message("pay me outside the platform, 9876543210"),
            Screening::Blocked
        );
        assert!(matches!(
            screen_message("call 9876543210"),
            Screening::Deliver(result) if result.is_filtered
        ));
    }
}
