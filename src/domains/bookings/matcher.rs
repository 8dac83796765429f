//! Promo-hunter detection: flags new bookings whose customer already
//! appears in the booking history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::models::{Booking, NewBooking};
use super::parser::{normalize_email, normalize_name, normalize_phone, normalize_social};

pub const STATUS_SCHEDULED: &str = "Scheduled";
pub const STATUS_PROMO_HUNTER: &str = "Promo hunter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchReason {
    #[serde(rename = "Name Match")]
    Name,
    #[serde(rename = "Email Match")]
    Email,
    #[serde(rename = "Phone Match")]
    Phone,
    #[serde(rename = "Social Media Match")]
    SocialMedia,
    #[serde(rename = "Companion Match")]
    Companion,
}

impl MatchReason {
    pub fn label(&self) -> &'static str {
        match self {
            MatchReason::Name => "Name Match",
            MatchReason::Email => "Email Match",
            MatchReason::Phone => "Phone Match",
            MatchReason::SocialMedia => "Social Media Match",
            MatchReason::Companion => "Companion Match",
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How hits are folded into the stored match fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    FirstMatch,
    #[default]
    AllMatches,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "first_match" => Ok(MatchPolicy::FirstMatch),
            "all" | "all_matches" => Ok(MatchPolicy::AllMatches),
            other => Err(format!("unknown match policy: {}", other)),
        }
    }
}

/// Normalized identity of an incoming booking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCandidate {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub social: String,
    pub companion_full_name: String,
}

impl MatchCandidate {
    pub fn new(full_name: &str, email: &str, phone: &str, social: &str, companion: &str) -> Self {
        Self {
            full_name: normalize_name(full_name),
            email: normalize_email(email),
            phone: normalize_phone(phone),
            social: normalize_social(social),
            companion_full_name: normalize_name(companion),
        }
    }

    pub fn from_request(req: &NewBooking) -> Self {
        Self::new(
            &req.full_name,
            req.email.as_deref().unwrap_or_default(),
            &req.phone,
            &req.social_media,
            req.companion
                .as_ref()
                .map(|c| c.full_name.as_str())
                .unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchHit {
    pub row_number: usize,
    pub record_id: String,
    pub reason: MatchReason,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub status: String,
    pub match_reason: String,
    pub matched_source: String,
    pub matched_row: String,
    pub hits: Vec<MatchHit>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        !self.hits.is_empty()
    }
}

fn same(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

#[derive(Debug, Clone)]
pub struct DuplicateMatcher {
    policy: MatchPolicy,
    table: String,
}

impl DuplicateMatcher {
    pub fn new(policy: MatchPolicy, table: impl Into<String>) -> Self {
        Self {
            policy,
            table: table.into(),
        }
    }

    /// First matching predicate for one historical record, if any.
    fn reason_for(candidate: &MatchCandidate, record: &Booking) -> Option<MatchReason> {
        if same(&candidate.full_name, &record.full_name_norm) {
            Some(MatchReason::Name)
        } else if same(&candidate.email, &record.email_norm) {
            Some(MatchReason::Email)
        } else if same(&candidate.phone, &record.phone_norm) {
            Some(MatchReason::Phone)
        } else if same(&candidate.social, &record.social_norm) {
            Some(MatchReason::SocialMedia)
        } else if same(&candidate.companion_full_name, &record.full_name_norm)
            || same(&candidate.full_name, &record.companion_full_name_norm)
        {
            Some(MatchReason::Companion)
        } else {
            None
        }
    }

    /// Every historical record that overlaps the candidate, in storage order.
    pub fn find_hits(&self, candidate: &MatchCandidate, history: &[Booking]) -> Vec<MatchHit> {
        history
            .iter()
            .filter_map(|record| {
                Self::reason_for(candidate, record).map(|reason| MatchHit {
                    row_number: record.row_number,
                    record_id: record.record_id.clone(),
                    reason,
                    source: format!("{}: {}", self.table, record.full_name),
                })
            })
            .collect()
    }

    /// Folds hits into the stored match fields. `requested_status` is kept
    /// only when nothing matched.
    pub fn evaluate(
        &self,
        candidate: &MatchCandidate,
        history: &[Booking],
        requested_status: Option<&str>,
    ) -> MatchResult {
        let hits = self.find_hits(candidate, history);

        if hits.is_empty() {
            let status = requested_status
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(STATUS_SCHEDULED);
            return MatchResult {
                status: status.to_string(),
                match_reason: String::new(),
                matched_source: String::new(),
                matched_row: String::new(),
                hits,
            };
        }

        let reported: &[MatchHit] = match self.policy {
            MatchPolicy::FirstMatch => &hits[..1],
            MatchPolicy::AllMatches => &hits,
        };

        MatchResult {
            status: STATUS_PROMO_HUNTER.to_string(),
            match_reason: join_distinct(reported.iter().map(|h| h.reason.label().to_string())),
            matched_source: join_distinct(reported.iter().map(|h| h.source.clone())),
            matched_row: join_distinct(reported.iter().map(|h| h.row_number.to_string())),
            hits,
        }
    }
}

/// Joins values with ", ", keeping the first occurrence of each.
fn join_distinct(values: impl Iterator<Item = String>) -> String {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::bookings::models::Companion;

    fn record(row: usize, name: &str, email: &str, phone: &str, companion: &str) -> Booking {
        let mut b = Booking {
            row_number: row,
            record_id: format!("rec-{}", row),
            full_name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            companion: (!companion.is_empty()).then(|| Companion {
                full_name: companion.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        b.refresh_norms();
        b
    }

    fn history() -> Vec<Booking> {
        vec![
            record(2, "Ana Cruz", "ana@example.com", "0917 111 2222", ""),
            record(3, "Ben Reyes", "ben@example.com", "0918 333 4444", "Carla Reyes"),
            record(4, "Dina Lopez", "", "", ""),
        ]
    }

    fn matcher(policy: MatchPolicy) -> DuplicateMatcher {
        DuplicateMatcher::new(policy, "DB")
    }

    #[test]
    fn test_email_only_overlap() {
        let candidate = MatchCandidate::new("Someone Else", "ANA@example.com ", "", "", "");
        let result = matcher(MatchPolicy::AllMatches).evaluate(&candidate, &history(), None);

        assert_eq!(result.status, STATUS_PROMO_HUNTER);
        assert_eq!(result.match_reason, "Email Match");
        assert_eq!(result.matched_source, "DB: Ana Cruz");
        assert_eq!(result.matched_row, "2");
    }

    #[test]
    fn test_no_overlap_passes_status_through() {
        let candidate = MatchCandidate::new("New Person", "new@example.com", "0999", "", "");
        let m = matcher(MatchPolicy::AllMatches);

        let result = m.evaluate(&candidate, &history(), None);
        assert_eq!(result.status, STATUS_SCHEDULED);
        assert!(result.match_reason.is_empty());
        assert!(!result.is_match());

        let result = m.evaluate(&candidate, &history(), Some("Confirmed"));
        assert_eq!(result.status, "Confirmed");
    }

    #[test]
    fn test_match_overrides_requested_status() {
        let candidate = MatchCandidate::new("ana cruz", "", "", "", "");
        let result = matcher(MatchPolicy::AllMatches).evaluate(&candidate, &history(), Some("Confirmed"));
        assert_eq!(result.status, STATUS_PROMO_HUNTER);
        assert_eq!(result.match_reason, "Name Match");
    }

    #[test]
    fn test_empty_fields_never_match() {
        let candidate = MatchCandidate::new("", "", "", "", "");
        assert!(matcher(MatchPolicy::AllMatches).find_hits(&candidate, &history()).is_empty());
    }

    #[test]
    fn test_companion_cross_match_both_directions() {
        let m = matcher(MatchPolicy::AllMatches);

        // candidate's companion is a past customer
        let c = MatchCandidate::new("Zed", "", "", "", "Dina Lopez");
        let hits = m.find_hits(&c, &history());
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].row_number, hits[0].reason), (4, MatchReason::Companion));

        // candidate was a past customer's companion
        let c = MatchCandidate::new("Carla  Reyes", "", "", "", "");
        let hits = m.find_hits(&c, &history());
        assert_eq!((hits[0].row_number, hits[0].reason), (3, MatchReason::Companion));
    }

    #[test]
    fn test_first_predicate_wins_per_record() {
        let candidate = MatchCandidate::new("Ana Cruz", "ana@example.com", "09171112222", "", "");
        let hits = matcher(MatchPolicy::AllMatches).find_hits(&candidate, &history());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reason, MatchReason::Name);
    }

    #[test]
    fn test_policies_over_multiple_hits() {
        // name hits row 2, phone hits row 3
        let candidate = MatchCandidate::new("Ana Cruz", "", "09183334444", "", "");

        let all = matcher(MatchPolicy::AllMatches).evaluate(&candidate, &history(), None);
        assert_eq!(all.match_reason, "Name Match, Phone Match");
        assert_eq!(all.matched_row, "2, 3");
        assert_eq!(all.matched_source, "DB: Ana Cruz, DB: Ben Reyes");
        assert_eq!(all.hits.len(), 2);

        let first = matcher(MatchPolicy::FirstMatch).evaluate(&candidate, &history(), None);
        assert_eq!(first.match_reason, "Name Match");
        assert_eq!(first.matched_row, "2");
        assert_eq!(first.hits.len(), 2);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("first".parse::<MatchPolicy>(), Ok(MatchPolicy::FirstMatch));
        assert_eq!("ALL".parse::<MatchPolicy>(), Ok(MatchPolicy::AllMatches));
        assert!("some".parse::<MatchPolicy>().is_err());
    }
}
