//! Cell-level cleanup shared by the JSON and CSV loaders.

use chrono::NaiveDate;

/// Trimmed cell content, or `None` for an empty cell.
pub(crate) fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reference code with any parenthesized suffix removed.
///
/// `"VS35 (x2)"` becomes `"VS35"`; a cell holding only a parenthesized note
/// is treated as empty.
pub(crate) fn clean_reference(raw: &str) -> Option<String> {
    let head = raw.split('(').next().unwrap_or_default();
    clean_cell(head)
}

/// Parse a `DD/MM/YYYY` date. Empty input is `Ok(None)`.
pub(crate) fn parse_dmy(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .map(Some)
        .map_err(|_| format!("invalid date '{raw}'"))
}

/// First day of the given month. Empty year is `Ok(None)`; an empty month
/// defaults to January.
pub(crate) fn parse_month_year(month: &str, year: &str) -> Result<Option<NaiveDate>, String> {
    let year = year.trim();
    if year.is_empty() {
        return Ok(None);
    }
    let month = month.trim();
    let invalid = || format!("invalid date '{month}/{year}'");

    let y: i32 = year.parse().map_err(|_| invalid())?;
    let m: u32 = if month.is_empty() {
        1
    } else {
        month.parse().map_err(|_| invalid())?
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .map(Some)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_reference_strips_parenthesized_suffix() {
        assert_eq!(clean_reference("VS35 (x2)").as_deref(), Some("VS35"));
        assert_eq!(clean_reference(" VS17 ").as_deref(), Some("VS17"));
        assert_eq!(clean_reference("(voir notice)"), None);
        assert_eq!(clean_reference(""), None);
    }

    #[test]
    fn parse_dmy_accepts_day_month_year() {
        assert_eq!(
            parse_dmy(Some("01/01/2010")).unwrap(),
            NaiveDate::from_ymd_opt(2010, 1, 1)
        );
        assert_eq!(
            parse_dmy(Some("31/12/2015")).unwrap(),
            NaiveDate::from_ymd_opt(2015, 12, 31)
        );
        assert_eq!(parse_dmy(None).unwrap(), None);
        assert_eq!(parse_dmy(Some("  ")).unwrap(), None);
    }

    #[test]
    fn parse_dmy_rejects_iso_and_garbage() {
        assert!(parse_dmy(Some("2010-01-01")).is_err());
        assert!(parse_dmy(Some("32/01/2010")).is_err());
        assert!(parse_dmy(Some("soon")).is_err());
    }

    #[test]
    fn parse_month_year_defaults_month() {
        assert_eq!(
            parse_month_year("", "2012").unwrap(),
            NaiveDate::from_ymd_opt(2012, 1, 1)
        );
        assert_eq!(
            parse_month_year("09", "2012").unwrap(),
            NaiveDate::from_ymd_opt(2012, 9, 1)
        );
        assert_eq!(parse_month_year("09", "").unwrap(), None);
        assert!(parse_month_year("13", "2012").is_err());
        assert!(parse_month_year("ab", "2012").is_err());
    }
}
