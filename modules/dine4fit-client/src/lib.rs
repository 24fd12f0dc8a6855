pub mod error;
pub mod types;

pub use error::{Dine4FitError, Result};
pub use types::{FoodDetail, FoodLabel, Nutrients};

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use types::FoodDocument;

const DETAIL_PATH: &str = "getPotravina.php";
const ROOT_ELEMENT: &str = "potravina";

pub struct Dine4FitClient {
    client: reqwest::Client,
    base_url: String,
    lang: String,
    access_key: String,
}

impl Dine4FitClient {
    pub fn new(base_url: &str, lang: &str, access_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: lang.to_string(),
            access_key: access_key.to_string(),
        })
    }

    /// Fetch and decode the detail document for one food GUID.
    pub async fn food(&self, guid: &str) -> Result<FoodDetail> {
        let endpoint = format!("{}/{}", self.base_url, DETAIL_PATH);

        let resp = self
            .client
            .get(&endpoint)
            .query(&[
                ("GUID_Potravina", guid),
                ("lang", self.lang.as_str()),
                ("pid", self.access_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(Dine4FitError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        tracing::debug!(guid, bytes = body.len(), "Fetched food detail");

        parse_food(&body)
    }
}

/// Decode a `potravina` document. Rejects bodies whose root element is
/// anything else (error pages, HTML maintenance banners).
pub fn parse_food(xml: &str) -> Result<FoodDetail> {
    let root = root_element(xml)?;
    if root != ROOT_ELEMENT {
        return Err(Dine4FitError::Decode(format!(
            "expected <{ROOT_ELEMENT}> root element, got <{root}>"
        )));
    }

    let doc: FoodDocument = quick_xml::de::from_str(xml)?;
    Ok(doc.into())
}

fn root_element(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Eof => return Err(Dine4FitError::Decode("empty document".to_string())),
            _ => continue,
        }
    }
}
