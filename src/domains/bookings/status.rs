use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Semantic category of a free-text booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Scheduled,
    Cancelled,
    Converted,
    PromoHunter,
    #[default]
    Unknown,
}

impl FromStr for StatusCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "scheduled" => Ok(StatusCategory::Scheduled),
            "cancelled" | "canceled" => Ok(StatusCategory::Cancelled),
            "converted" => Ok(StatusCategory::Converted),
            "promo_hunter" => Ok(StatusCategory::PromoHunter),
            "unknown" => Ok(StatusCategory::Unknown),
            other => Err(format!("unknown status category: {}", other)),
        }
    }
}

/// Classification of one status, computed once when a row is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusClass {
    pub category: StatusCategory,
    /// The customer physically showed up.
    pub arrived: bool,
    /// The status is on the purchase allow-list and counts toward sales.
    pub purchase: bool,
}

impl StatusClass {
    pub fn is_cancelled(&self) -> bool {
        self.category == StatusCategory::Cancelled
    }
}

/// Maps free-text statuses onto [`StatusCategory`] with case-insensitive
/// substring rules. Purchase statuses are an exact (case-insensitive)
/// allow-list.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    purchase_statuses: Vec<String>,
}

impl StatusClassifier {
    pub fn new<I, S>(purchase_statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            purchase_statuses: purchase_statuses
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn classify(&self, raw: &str) -> StatusClass {
        let status = raw.trim().to_lowercase();
        if status.is_empty() {
            return StatusClass::default();
        }

        let on_allow_list = self.purchase_statuses.iter().any(|p| *p == status);

        let category = if status.contains("cancel") {
            StatusCategory::Cancelled
        } else if status.contains("promo hunter") || status.contains("promohunter") {
            StatusCategory::PromoHunter
        } else if on_allow_list || (status.contains("bought") && !status.contains("not bought")) {
            StatusCategory::Converted
        } else if status.contains("schedul") || status.contains("confirm") || status.contains("pending") {
            StatusCategory::Scheduled
        } else {
            StatusCategory::Unknown
        };

        let cancelled = category == StatusCategory::Cancelled;
        let arrived = !cancelled && (status.contains("arrived") || status.contains("comeback"));

        StatusClass {
            category,
            arrived,
            purchase: on_allow_list && !cancelled,
        }
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(shared::config::DEFAULT_PURCHASE_STATUSES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_categories() {
        let c = StatusClassifier::default();
        assert_eq!(c.classify("Scheduled").category, StatusCategory::Scheduled);
        assert_eq!(c.classify("Re-scheduled").category, StatusCategory::Scheduled);
        assert_eq!(c.classify("CANCELLED").category, StatusCategory::Cancelled);
        assert_eq!(c.classify("Cancelled - no reply").category, StatusCategory::Cancelled);
        assert_eq!(c.classify("Promo hunter").category, StatusCategory::PromoHunter);
        assert_eq!(c.classify("Arrived & Bought").category, StatusCategory::Converted);
        assert_eq!(c.classify("no show").category, StatusCategory::Unknown);
        assert_eq!(c.classify("   ").category, StatusCategory::Unknown);
    }

    #[test]
    fn test_arrived_not_bought_is_arrived_without_purchase() {
        let c = StatusClassifier::default();
        let class = c.classify("Arrived & not bought");
        assert!(class.arrived);
        assert!(!class.purchase);
        assert_ne!(class.category, StatusCategory::Converted);
    }

    #[test]
    fn test_purchase_is_exact_allow_list() {
        let c = StatusClassifier::default();
        assert!(c.classify(" comeback & BOUGHT ").purchase);
        assert!(c.classify("arrived & bought").purchase);
        // Converted by wording, but not on the allow-list
        let walk_in = c.classify("walk-in bought");
        assert_eq!(walk_in.category, StatusCategory::Converted);
        assert!(!walk_in.purchase);
    }

    #[test]
    fn test_custom_allow_list() {
        let c = StatusClassifier::new(["Paid"]);
        assert!(c.classify("paid").purchase);
        assert!(!c.classify("arrived & bought").purchase);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("promo-hunter".parse::<StatusCategory>(), Ok(StatusCategory::PromoHunter));
        assert_eq!("Canceled".parse::<StatusCategory>(), Ok(StatusCategory::Cancelled));
        assert!("vip".parse::<StatusCategory>().is_err());
    }
}
