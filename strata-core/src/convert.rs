//! Type-conversion policy for `MODIFY_COLUMN` migrations.
//!
//! Given the current and requested physical types, [`classify`] decides whether the
//! conversion is a no-op, safe without looking at data, safe only after a full-column
//! scan, or rejected outright. The scan itself is executed by the schema driver; this
//! module only states *which* scan is required.

use crate::physical::PhysicalType;

/// The data scan a conversion requires before DDL may be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionCheck {
    /// Source and target types are identical; nothing to do.
    NoOp,
    /// Conversion is safe by construction; no scan.
    Safe,
    /// Every non-null value must parse as a decimal number.
    ScanDecimal,
    /// Every non-null value must parse as an integer.
    ScanInteger,
    /// Every non-null value must be an ISO `YYYY-MM-DD` date.
    ScanDate,
    /// Every non-null value must be an `HH:MM[:SS]` time of day.
    ScanTime,
    /// Every non-null value must be an ISO date or date-time.
    ScanTimestamp,
    /// No value may exceed the target length.
    ScanLength(u32),
}

/// Outcome of classifying a `from → to` conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionRule {
    /// The conversion may proceed once the given check passes.
    Allowed(ConversionCheck),
    /// The conversion is never performed; the reason is surfaced to the caller.
    Rejected(&'static str),
}

/// Classifies a physical type conversion.
///
/// | From → To | Policy |
/// |---|---|
/// | identical | no-op |
/// | bounded string → unbounded text, or widening length | safe |
/// | numeric/integer/date/time/timestamp → string | safe |
/// | integer → numeric, date → timestamp | safe (widening) |
/// | string → numeric/integer | scan values |
/// | string → date/time/timestamp | scan values |
/// | text → bounded string, or narrowing length | scan lengths |
/// | structured document ↔ anything | rejected |
/// | any other pair | rejected |
pub fn classify(from: &PhysicalType, to: &PhysicalType) -> ConversionRule {
    use ConversionCheck::*;
    use ConversionRule::*;
    use PhysicalType::*;

    if from == to {
        return Allowed(NoOp);
    }

    match (*from, *to) {
        // Structured documents never convert to or from scalars.
        (JsonB, _) | (_, JsonB) => {
            Rejected("structured document columns cannot be converted to or from scalar types")
        }

        // String widening.
        (VarChar(a), VarChar(b)) if b >= a => Allowed(Safe),
        (VarChar(a), VarChar(b)) if b < a => Allowed(ScanLength(b)),
        (VarChar(_), Text) => Allowed(Safe),
        (Text, VarChar(n)) => Allowed(ScanLength(n)),

        // Scalar → string renders are always safe.
        (Numeric | Integer | Date | Time | Timestamp, Text | VarChar(_)) => Allowed(Safe),

        // String → typed scalar needs a value scan.
        (VarChar(_) | Text, Numeric) => Allowed(ScanDecimal),
        (VarChar(_) | Text, Integer) => Allowed(ScanInteger),
        (VarChar(_) | Text, Date) => Allowed(ScanDate),
        (VarChar(_) | Text, Time) => Allowed(ScanTime),
        (VarChar(_) | Text, Timestamp) => Allowed(ScanTimestamp),

        // Numeric and temporal widenings.
        (Integer, Numeric) => Allowed(Safe),
        (Date, Timestamp) => Allowed(Safe),

        _ => Rejected("no supported conversion between these column types"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversionCheck::*;
    use ConversionRule::*;
    use PhysicalType::*;

    #[test]
    fn test_identical_is_noop() {
        assert_eq!(classify(&Text, &Text), Allowed(NoOp));
        assert_eq!(classify(&VarChar(255), &VarChar(255)), Allowed(NoOp));
    }

    #[test]
    fn test_string_widening_is_safe() {
        assert_eq!(classify(&VarChar(255), &Text), Allowed(Safe));
        assert_eq!(classify(&VarChar(20), &VarChar(255)), Allowed(Safe));
    }

    #[test]
    fn test_string_narrowing_scans_lengths() {
        assert_eq!(classify(&Text, &VarChar(255)), Allowed(ScanLength(255)));
        assert_eq!(classify(&VarChar(500), &VarChar(20)), Allowed(ScanLength(20)));
    }

    #[test]
    fn test_scalar_to_string_is_safe() {
        assert_eq!(classify(&Numeric, &Text), Allowed(Safe));
        assert_eq!(classify(&Date, &VarChar(255)), Allowed(Safe));
        assert_eq!(classify(&Timestamp, &Text), Allowed(Safe));
        assert_eq!(classify(&Integer, &VarChar(255)), Allowed(Safe));
    }

    #[test]
    fn test_string_to_scalar_requires_scan() {
        assert_eq!(classify(&Text, &Numeric), Allowed(ScanDecimal));
        assert_eq!(classify(&VarChar(255), &Integer), Allowed(ScanInteger));
        assert_eq!(classify(&VarChar(255), &Date), Allowed(ScanDate));
        assert_eq!(classify(&Text, &Time), Allowed(ScanTime));
        assert_eq!(classify(&Text, &Timestamp), Allowed(ScanTimestamp));
    }

    #[test]
    fn test_structured_documents_never_convert() {
        assert!(matches!(classify(&JsonB, &Text), Rejected(_)));
        assert!(matches!(classify(&Numeric, &JsonB), Rejected(_)));
        assert_eq!(classify(&JsonB, &JsonB), Allowed(NoOp));
    }

    #[test]
    fn test_decided_widenings() {
        assert_eq!(classify(&Integer, &Numeric), Allowed(Safe));
        assert_eq!(classify(&Date, &Timestamp), Allowed(Safe));
        // The reverse narrowings stay rejected.
        assert!(matches!(classify(&Numeric, &Integer), Rejected(_)));
        assert!(matches!(classify(&Timestamp, &Date), Rejected(_)));
    }
}
