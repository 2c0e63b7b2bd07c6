use crate::error::CoreError;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A look-back window used to select the date range of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    YearToDate,
    OneYear,
    ThreeYears,
    FiveYears,
    Max,
}

impl Period {
    /// Returns the `(start, end)` dates of this period, ending on `today`.
    ///
    /// Month-based periods are approximated with 30-day months and years
    /// with 365 days. `Max` starts on 2010-01-01.
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            Period::OneMonth => today - Duration::days(30),
            Period::ThreeMonths => today - Duration::days(90),
            Period::SixMonths => today - Duration::days(180),
            Period::YearToDate => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            Period::OneYear => today - Duration::days(365),
            Period::ThreeYears => today - Duration::days(365 * 3),
            Period::FiveYears => today - Duration::days(365 * 5),
            Period::Max => NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or(today),
        };
        (start, today)
    }

    /// The short code accepted on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            Period::OneMonth => "1m",
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::YearToDate => "YTD",
            Period::OneYear => "1a",
            Period::ThreeYears => "3a",
            Period::FiveYears => "5a",
            Period::Max => "MAX",
        }
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Years are accepted both as "a" (année) and "y".
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Period::OneMonth),
            "3m" => Ok(Period::ThreeMonths),
            "6m" => Ok(Period::SixMonths),
            "ytd" => Ok(Period::YearToDate),
            "1a" | "1y" => Ok(Period::OneYear),
            "3a" | "3y" => Ok(Period::ThreeYears),
            "5a" | "5y" => Ok(Period::FiveYears),
            "max" => Ok(Period::Max),
            _ => Err(CoreError::UnknownPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("ytd".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!("1A".parse::<Period>().unwrap(), Period::OneYear);
        assert_eq!("3y".parse::<Period>().unwrap(), Period::ThreeYears);
        assert_eq!("MAX".parse::<Period>().unwrap(), Period::Max);
        assert!(matches!("2w".parse::<Period>(), Err(CoreError::UnknownPeriod(_))));
    }

    #[test]
    fn resolves_date_ranges_from_today() {
        let today = date(2024, 6, 15);
        assert_eq!(Period::OneMonth.date_range(today), (date(2024, 5, 16), today));
        assert_eq!(Period::YearToDate.date_range(today), (date(2024, 1, 1), today));
        assert_eq!(Period::OneYear.date_range(today), (date(2023, 6, 16), today));
        assert_eq!(Period::Max.date_range(today), (date(2010, 1, 1), today));
    }
}
