use serde::{Deserialize, Serialize};

/// A resolved food record.
///
/// Only records with a non-empty `image` are usable: an empty image marks a
/// food the source has blocked or withdrawn, and such a record must never
/// be cached or written out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub category: String,
    pub eans: Vec<String>,
    pub nutrition: Nutrition,
    pub image: String,
    #[serde(default)]
    pub vitamins: Vec<Label>,
    #[serde(default)]
    pub minerals: Vec<Label>,
}

impl Record {
    pub fn is_available(&self) -> bool {
        !self.image.trim().is_empty()
    }
}

/// Nutrition attributes kept as the source's text (no unit or locale
/// normalization). Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrition {
    pub energy: String,
    pub protein: String,
    pub fat: String,
    pub carbohydrate: String,
    pub salt: String,
    pub water: String,
    pub sugar: String,
    pub calcium: String,
    pub glycemic_index: String,
    pub phenylalanine: String,
    pub alcohol: String,
}

/// Vitamin or mineral label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_with_image_is_available() {
        let record = Record {
            id: "a".into(),
            image: "img.png".into(),
            ..Default::default()
        };
        assert!(record.is_available());
    }

    #[test]
    fn blank_image_is_unavailable() {
        let empty = Record::default();
        let blank = Record {
            image: "   ".into(),
            ..Default::default()
        };
        assert!(!empty.is_available());
        assert!(!blank.is_available());
    }
}
