use super::result::Detection;

/// Labels counted as a person, English and Spanish, lower-case.
pub const PERSON_LABELS: &[&str] = &[
    "person", "people", "man", "woman", "boy", "girl", "child", "persona", "personas", "hombre",
    "mujer", "niño", "niña",
];

/// Case-insensitive exact match against a fixed label set.
#[derive(Clone, Debug)]
pub struct LabelFilter {
    labels: Vec<String>,
}

impl LabelFilter {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|label| label.as_ref().trim().to_lowercase())
                .filter(|label| !label.is_empty())
                .collect(),
        }
    }

    pub fn persons() -> Self {
        Self::new(PERSON_LABELS)
    }

    pub fn matches(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        self.labels.iter().any(|known| *known == label)
    }

    /// Keep the detections whose label is in the set, preserving order.
    pub fn retain(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|d| self.matches(&d.label))
            .collect()
    }
}

impl Default for LabelFilter {
    fn default() -> Self {
        Self::persons()
    }
}
