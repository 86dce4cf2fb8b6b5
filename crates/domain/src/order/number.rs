//! Human-readable order numbers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generates order numbers of the form `ORD-YYMMDD-XXXXXX`.
///
/// The suffix is six uppercase hex digits taken from a random UUID. A number
/// is only regenerated when the store rejects it as a duplicate before the
/// order's first write.
#[derive(Debug, Clone)]
pub struct OrderNumberGenerator {
    prefix: String,
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new("ORD")
    }
}

impl OrderNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns a fresh number dated `now`.
    pub fn generate(&self, now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        format!("{}-{}-{}", self.prefix, now.format("%y%m%d"), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        let number = OrderNumberGenerator::default().generate(now);

        assert_eq!(number.len(), "ORD-260307-XXXXXX".len());
        assert!(number.starts_with("ORD-260307-"));
        let suffix = &number["ORD-260307-".len()..];
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn test_numbers_differ() {
        let generator = OrderNumberGenerator::new("TST");
        let now = Utc::now();
        assert_ne!(generator.generate(now), generator.generate(now));
    }
}
