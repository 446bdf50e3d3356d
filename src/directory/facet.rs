use std::collections::BTreeMap;

use super::{BusinessRecord, PriceRange};

/// Distinct option values present in a set of records, with the number of
/// records carrying each one. Empty strings are not options.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Facets {
    pub(crate) categories: Vec<(String, usize)>,
    pub(crate) areas: Vec<(String, usize)>,
    pub(crate) cities: Vec<(String, usize)>,
    pub(crate) price_ranges: Vec<(PriceRange, usize)>,
}

impl Facets {
    pub(crate) fn collect<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a BusinessRecord>,
    {
        let mut categories = BTreeMap::new();
        let mut areas = BTreeMap::new();
        let mut cities = BTreeMap::new();
        let mut price_ranges = BTreeMap::new();

        for record in records {
            count_value(&mut categories, &record.category);
            count_value(&mut areas, &record.area);
            count_value(&mut cities, &record.city);
            if let Some(price_range) = record.price_range {
                *price_ranges.entry(price_range).or_insert(0) += 1;
            }
        }

        Self {
            categories: categories.into_iter().collect(),
            areas: areas.into_iter().collect(),
            cities: cities.into_iter().collect(),
            price_ranges: price_ranges.into_iter().collect(),
        }
    }
}

fn count_value(acc: &mut BTreeMap<String, usize>, value: &str) {
    if value.is_empty() {
        return;
    }
    if let Some(count) = acc.get_mut(value) {
        *count += 1;
    } else {
        acc.insert(value.to_string(), 1);
    }
}
