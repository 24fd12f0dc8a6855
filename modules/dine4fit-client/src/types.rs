use serde::Deserialize;

// --- Public types ---

/// A food detail document, with every optional field flattened to a
/// (possibly empty) string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoodDetail {
    pub name: String,
    pub category: String,
    pub eans: Vec<String>,
    pub nutrients: Nutrients,
    /// Image path. Empty when the food is blocked or withdrawn.
    pub image: String,
    pub vitamins: Vec<FoodLabel>,
    pub minerals: Vec<FoodLabel>,
}

/// Nutrition values exactly as the endpoint reports them (free text,
/// locale-dependent decimal separators).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nutrients {
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

/// A vitamin or mineral label: short name plus free-text description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoodLabel {
    pub name: String,
    pub description: String,
}

// --- Wire types (root element `potravina`) ---

#[derive(Debug, Deserialize)]
pub(crate) struct FoodDocument {
    #[serde(rename = "nazev", default)]
    name: Option<String>,
    #[serde(rename = "kategorie", default)]
    category: Option<String>,
    #[serde(default)]
    eans: Vec<EanList>,
    #[serde(rename = "hodnoty", default)]
    values: Option<ValueBlock>,
    #[serde(default)]
    image: Option<String>,
    #[serde(rename = "stitkyVitaminy", default)]
    vitamins: Vec<LabelList>,
    #[serde(rename = "stitkyMineraly", default)]
    minerals: Vec<LabelList>,
}

#[derive(Debug, Default, Deserialize)]
struct EanList {
    #[serde(rename = "ean", default)]
    items: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueBlock {
    #[serde(rename = "energie", default)]
    energy: Option<String>,
    #[serde(rename = "bilkoviny", default)]
    protein: Option<String>,
    #[serde(rename = "tuky", default)]
    fat: Option<String>,
    #[serde(rename = "sacharidy", default)]
    carbohydrate: Option<String>,
    #[serde(rename = "sul", default)]
    salt: Option<String>,
    #[serde(rename = "voda", default)]
    water: Option<String>,
    #[serde(rename = "cukry", default)]
    sugar: Option<String>,
    #[serde(rename = "vapnik", default)]
    calcium: Option<String>,
    #[serde(default)]
    gi: Option<String>,
    #[serde(default)]
    phe: Option<String>,
    #[serde(default)]
    alcohol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelList {
    #[serde(rename = "stitek", default)]
    items: Vec<WireLabel>,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    #[serde(rename = "@nazev", default)]
    name: Option<String>,
    #[serde(rename = "$text", default)]
    description: Option<String>,
}

impl From<FoodDocument> for FoodDetail {
    fn from(doc: FoodDocument) -> Self {
        let values = doc.values.unwrap_or_default();
        Self {
            name: doc.name.unwrap_or_default(),
            category: doc.category.unwrap_or_default(),
            eans: doc.eans.into_iter().flat_map(|list| list.items).collect(),
            nutrients: Nutrients {
                energy: values.energy.unwrap_or_default(),
                protein: values.protein.unwrap_or_default(),
                fat: values.fat.unwrap_or_default(),
                carbohydrate: values.carbohydrate.unwrap_or_default(),
                salt: values.salt.unwrap_or_default(),
                water: values.water.unwrap_or_default(),
                sugar: values.sugar.unwrap_or_default(),
                calcium: values.calcium.unwrap_or_default(),
                glycemic_index: values.gi.unwrap_or_default(),
                phenylalanine: values.phe.unwrap_or_default(),
                alcohol: values.alcohol.unwrap_or_default(),
            },
            image: doc.image.unwrap_or_default(),
            vitamins: labels(doc.vitamins),
            minerals: labels(doc.minerals),
        }
    }
}

fn labels(blocks: Vec<LabelList>) -> Vec<FoodLabel> {
    blocks
        .into_iter()
        .flat_map(|block| block.items)
        .map(|l| FoodLabel {
            name: l.name.unwrap_or_default(),
            description: l.description.unwrap_or_default(),
        })
        .collect()
}
