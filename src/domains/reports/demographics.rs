use serde::Serialize;

use super::numeric::{group_key, Tally};
use crate::domains::bookings::Booking;

/// Inclusive age bands; the last band is open-ended.
const AGE_BANDS: &[(&str, u32, u32)] = &[
    ("18-25", 18, 25),
    ("26-35", 26, 35),
    ("36-45", 36, 45),
    ("46-55", 46, 55),
    ("56+", 56, u32::MAX),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Demographics {
    pub total: usize,
    pub age: Vec<HistogramBin>,
    /// Ages that are missing or below the first band.
    pub age_unknown: usize,
    pub gender: Vec<HistogramBin>,
}

/// Title-cases a gender label so "female" and "FEMALE" group together.
fn gender_label(raw: &str) -> String {
    let raw = group_key(raw, "Unspecified").to_lowercase();
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => raw,
    }
}

/// Age and gender histograms over the whole collection.
pub fn demographics(bookings: &[Booking]) -> Demographics {
    let mut age: Vec<HistogramBin> = AGE_BANDS
        .iter()
        .map(|(label, _, _)| HistogramBin {
            label: label.to_string(),
            count: 0,
        })
        .collect();
    let mut age_unknown = 0;
    let mut genders = Tally::new();

    for b in bookings {
        match AGE_BANDS
            .iter()
            .position(|(_, lo, hi)| b.age >= *lo && b.age <= *hi)
        {
            Some(i) => age[i].count += 1,
            None => age_unknown += 1,
        }
        genders.add(&gender_label(&b.gender), 0.0);
    }

    let mut gender: Vec<HistogramBin> = genders
        .entries()
        .into_iter()
        .map(|(label, count, _)| HistogramBin { label, count })
        .collect();
    gender.sort_by(|a, b| b.count.cmp(&a.count));

    Demographics {
        total: bookings.len(),
        age,
        age_unknown,
        gender,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(age: u32, gender: &str) -> Booking {
        Booking {
            age,
            gender: gender.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_age_bands_and_unknown() {
        let data = vec![
            person(18, "F"),
            person(25, "female"),
            person(26, "Female"),
            person(56, "MALE"),
            person(90, "male"),
            person(0, ""),
            person(12, ""),
        ];
        let d = demographics(&data);
        let counts: Vec<usize> = d.age.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 0, 0, 2]);
        assert_eq!(d.age_unknown, 2);
        assert_eq!(d.total, 7);
    }

    #[test]
    fn test_gender_groups_case_insensitively() {
        let data = vec![person(30, "female"), person(30, "FEMALE"), person(30, ""), person(30, "Male")];
        let d = demographics(&data);
        assert_eq!(d.gender[0], HistogramBin { label: "Female".into(), count: 2 });
        assert!(d.gender.iter().any(|g| g.label == "Unspecified"));
        assert_eq!(d.gender.len(), 3);
    }

    #[test]
    fn test_empty_collection() {
        let d = demographics(&[]);
        assert_eq!(d.age.len(), 5);
        assert!(d.gender.is_empty());
        assert_eq!(d.age_unknown, 0);
    }
}
