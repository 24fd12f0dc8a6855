// DetailFetcher is the seam between the worker pool and the network.
// Workers only see `Result<Record, FetchError>`; the Dine4Fit client and
// the test MockFetcher both sit behind it.

use async_trait::async_trait;
use dine4fit_client::{Dine4FitClient, FoodDetail, FoodLabel};
use foodcrawl_common::{Label, Nutrition, Record};

use crate::error::FetchError;

#[async_trait]
pub trait DetailFetcher: Send + Sync {
    /// One fetch attempt for `id`. Unavailable records come back as `Ok`
    /// with an empty image; callers decide what to do with them.
    async fn fetch(&self, id: &str) -> Result<Record, FetchError>;
}

#[async_trait]
impl DetailFetcher for Dine4FitClient {
    async fn fetch(&self, id: &str) -> Result<Record, FetchError> {
        let detail = self.food(id).await?;
        Ok(record_from_detail(id, detail))
    }
}

pub fn record_from_detail(id: &str, detail: FoodDetail) -> Record {
    let n = detail.nutrients;
    Record {
        id: id.to_string(),
        name: detail.name,
        category: detail.category,
        eans: detail.eans,
        nutrition: Nutrition {
            energy: n.energy,
            protein: n.protein,
            fat: n.fat,
            carbohydrate: n.carbohydrate,
            salt: n.salt,
            water: n.water,
            sugar: n.sugar,
            calcium: n.calcium,
            glycemic_index: n.glycemic_index,
            phenylalanine: n.phenylalanine,
            alcohol: n.alcohol,
        },
        image: detail.image,
        vitamins: detail.vitamins.into_iter().map(label).collect(),
        minerals: detail.minerals.into_iter().map(label).collect(),
    }
}

fn label(l: FoodLabel) -> Label {
    Label {
        name: l.name,
        description: l.description,
    }
}
