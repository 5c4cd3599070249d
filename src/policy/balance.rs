use chrono::NaiveDate;

/// Remaining leave for a user with allotment `days` and the given request ranges.
///
/// Every range counts, whatever its status. A range whose end precedes its
/// start contributes a negative length. A null or zero allotment yields 0.
pub fn days_left<I>(days: Option<i64>, ranges: I) -> i64
where
    I: IntoIterator<Item = (NaiveDate, NaiveDate)>,
{
    let total: i64 = ranges
        .into_iter()
        .map(|(start, end)| (end - start).num_days())
        .sum();

    match days {
        Some(days) if days != 0 => days - total,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn no_requests_leaves_the_full_allotment() {
        assert_eq!(days_left(Some(20), Vec::new()), 20);
    }

    #[test]
    fn sums_every_range() {
        let ranges = vec![
            (d("2024-01-01"), d("2024-01-06")),
            (d("2024-02-10"), d("2024-02-12")),
        ];
        assert_eq!(days_left(Some(20), ranges), 13);
    }

    #[test]
    fn inverted_range_gives_days_back() {
        let ranges = vec![
            (d("2024-01-01"), d("2024-01-06")),
            (d("2024-03-10"), d("2024-03-07")),
        ];
        assert_eq!(days_left(Some(10), ranges), 8);
    }

    #[test]
    fn missing_or_zero_allotment_is_zero() {
        let ranges = vec![(d("2024-01-01"), d("2024-01-06"))];
        assert_eq!(days_left(None, ranges.clone()), 0);
        assert_eq!(days_left(Some(0), ranges), 0);
    }

    #[test]
    fn overdrawn_balance_goes_negative() {
        let ranges = vec![(d("2024-01-01"), d("2024-01-31"))];
        assert_eq!(days_left(Some(20), ranges), -10);
    }
}
