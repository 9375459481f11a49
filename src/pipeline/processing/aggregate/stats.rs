use std::collections::{BTreeMap, HashMap};

use crate::constants::GROWTH_WINDOW_YEARS;

/// Arithmetic mean, `None` for an empty sample
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Statistical median; the two middle values are averaged for even sizes
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Year-over-year momentum of new startups in a sector.
///
/// Counts startups per founding year and compares the latest observed year
/// with the earliest year of the trailing window (the last three years of the
/// observed span, or fewer if the span is shorter). Years inside the window
/// without any startup count as zero. Returns 0 when fewer than two distinct
/// founding years exist or the window starts on an empty year.
pub fn growth_rate<I>(founded_years: I) -> f64
where
    I: IntoIterator<Item = i32>,
{
    let mut per_year: BTreeMap<i32, u64> = BTreeMap::new();
    for year in founded_years {
        *per_year.entry(year).or_insert(0) += 1;
    }
    if per_year.len() < 2 {
        return 0.0;
    }

    let (Some((&first_year, _)), Some((&last_year, &last_count))) =
        (per_year.iter().next(), per_year.iter().next_back())
    else {
        return 0.0;
    };

    let window_start = (last_year - GROWTH_WINDOW_YEARS + 1).max(first_year);
    let start_count = per_year.get(&window_start).copied().unwrap_or(0);
    if start_count == 0 {
        return 0.0;
    }

    (last_count as f64 - start_count as f64) / start_count as f64
}

/// Most frequent values, ties broken by first appearance, at most `limit`
pub fn top_by_frequency<'a, I>(values: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<(&str, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for value in values {
        match index.get(value) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(value, order.len());
                order.push((value, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
        .into_iter()
        .take(limit)
        .map(|(value, _)| value.to_string())
        .collect()
}
