use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONNECTION};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::client::ListingClient;
use super::error::ListingError;
use super::link::InspectLink;
use super::types::*;
use crate::core::config::MarketplaceConfig;
use crate::proxy::ProxyIdentity;
use crate::watchlist::WatchedItem;

#[derive(Debug, Clone)]
pub struct SteamClientOptions {
    pub request_timeout: Duration,
    pub listings_per_page: u32,
    pub currency: u32,
}

impl Default for SteamClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            listings_per_page: 10,
            currency: 1,
        }
    }
}

/// Steam community market + float API adapter.
pub struct SteamMarketClient {
    config: MarketplaceConfig,
    options: SteamClientOptions,
    direct: Client,
    proxied: Mutex<HashMap<String, Client>>,
}

impl SteamMarketClient {
    pub fn new(config: MarketplaceConfig, options: SteamClientOptions) -> Result<Self, ListingError> {
        let direct = build_client(&config.user_agent, options.request_timeout, None)?;
        Ok(Self {
            config,
            options,
            direct,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    fn client_for(&self, proxy: Option<&ProxyIdentity>) -> Result<Client, ListingError> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };

        let mut clients = self.proxied.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = clients.get(&proxy.address) {
            return Ok(client.clone());
        }

        let client = build_client(
            &self.config.user_agent,
            self.options.request_timeout,
            Some(&proxy.address),
        )?;
        clients.insert(proxy.address.clone(), client.clone());
        tracing::debug!("Built HTTP client for proxy {}", proxy.address);
        Ok(client)
    }

    fn render_url(&self, label: &str) -> Result<Url, ListingError> {
        let mut url = Url::parse(&self.config.listings_url)
            .map_err(|e| ListingError::InvalidReference(format!("bad listings url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ListingError::InvalidReference("listings url cannot be a base".into()))?
            .pop_if_empty()
            .push(label)
            .push("render")
            .push("");
        url.query_pairs_mut()
            .append_pair("query", "")
            .append_pair("start", "0")
            .append_pair("count", &self.options.listings_per_page.to_string())
            .append_pair("currency", &self.options.currency.to_string())
            .append_pair("language", "english")
            .append_pair("format", "json");
        Ok(url)
    }

    async fn inspect(&self, client: &Client, link: &InspectLink) -> Result<FloatItemInfo, ListingError> {
        let response = client
            .get(&self.config.float_api_url)
            .query(&[("url", link.to_string())])
            .send()
            .await?;
        let body: FloatApiResponse = read_json(response, "float api").await?;
        Ok(body.iteminfo)
    }
}

#[async_trait]
impl ListingClient for SteamMarketClient {
    async fn resolve(&self, link: &str) -> Result<ItemMetadata, ListingError> {
        let link = InspectLink::parse(link)?;

        let info = self.inspect(&self.direct, &link).await.map_err(|e| match e {
            ListingError::NotFound(_) => {
                ListingError::InvalidReference(format!("no item behind link {}", link))
            }
            other => other,
        })?;

        let label = info
            .full_item_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ListingError::Upstream("float api returned no item name".into()))?;

        Ok(ItemMetadata {
            label,
            rarity: info.rarity_name.unwrap_or_default(),
            image_ref: info.imageurl.unwrap_or_default(),
        })
    }

    async fn poll(
        &self,
        item: &WatchedItem,
        proxy: Option<ProxyIdentity>,
    ) -> Result<ListingSnapshot, ListingError> {
        let client = self.client_for(proxy.as_ref())?;

        let response = client.get(self.render_url(&item.label)?).send().await?;
        let page: RenderResponse = read_json(response, &item.label).await?;
        if !page.success {
            return Err(ListingError::Upstream(format!(
                "listing page for {} reported failure",
                item.label
            )));
        }

        let listings = page.listings()?;
        let listing = cheapest_listing(&listings)
            .ok_or_else(|| ListingError::NotFound(format!("no active listings for {}", item.label)))?;
        let price = listing
            .price()
            .ok_or_else(|| ListingError::Upstream("listing without price".into()))?;

        let template = listing
            .inspect_template()
            .ok_or_else(|| ListingError::Upstream("listing without inspect action".into()))?;
        let link = InspectLink::from_template(template, &listing.listingid, &listing.asset.id)
            .map_err(|e| ListingError::Upstream(e.to_string()))?;

        // The listing exists; a float lookup miss is the float service's problem.
        let info = self.inspect(&client, &link).await.map_err(|e| match e {
            ListingError::NotFound(msg) => ListingError::Upstream(msg),
            other => other,
        })?;

        Ok(ListingSnapshot {
            float: info.floatvalue,
            price,
            title: info.full_item_name.unwrap_or_else(|| item.label.clone()),
            image_ref: info.imageurl.unwrap_or_default(),
            rarity: info.rarity_name.unwrap_or_default(),
        })
    }

    async fn fetch_image(&self, image_ref: &str) -> Result<Vec<u8>, ListingError> {
        let response = self.direct.get(image_ref).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, image_ref, String::new()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn build_client(user_agent: &str, timeout: Duration, proxy: Option<&str>) -> Result<Client, ListingError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("keep-alive", HeaderValue::from_static("3600"));

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout);

    if let Some(address) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url(address))
            .map_err(|e| ListingError::InvalidReference(format!("bad proxy {}: {}", address, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ListingError::Upstream(format!("failed to build HTTP client: {}", e)))
}

/// Bare `host:port` proxies are treated as HTTP proxies.
pub fn proxy_url(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

pub fn cheapest_listing(listings: &[RenderListing]) -> Option<&RenderListing> {
    listings
        .iter()
        .filter(|listing| listing.total_cents().is_some())
        .min_by_key(|listing| listing.total_cents())
}

fn classify_status(status: StatusCode, what: &str, body: String) -> ListingError {
    match status {
        StatusCode::NOT_FOUND => ListingError::NotFound(what.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ListingError::Upstream(format!("rate limited while fetching {}", what)),
        _ => {
            let detail = serde_json::from_str::<FloatApiError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            ListingError::Upstream(format!("{} returned {}: {}", what, status, detail))
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ListingError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!("{} answered {}: {}", what, status, body);
        return Err(classify_status(status, what, body));
    }

    // Steam answers `null` with 200 when it throttles a client.
    if body.trim().is_empty() || body.trim() == "null" {
        return Err(ListingError::Upstream(format!("empty response for {}", what)));
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, price: Option<i64>, fee: Option<i64>) -> RenderListing {
        RenderListing {
            listingid: id.to_string(),
            converted_price: price,
            converted_fee: fee,
            asset: RenderAsset {
                id: format!("asset-{}", id),
                market_actions: Vec::new(),
            },
        }
    }

    fn client() -> SteamMarketClient {
        SteamMarketClient::new(MarketplaceConfig::default(), SteamClientOptions::default()).unwrap()
    }

    #[test]
    fn test_proxy_url_adds_scheme() {
        assert_eq!(proxy_url("10.0.0.1:8080"), "http://10.0.0.1:8080");
        assert_eq!(proxy_url("socks5://10.0.0.1:1080"), "socks5://10.0.0.1:1080");
    }

    #[test]
    fn test_cheapest_listing_skips_unpriced() {
        let listings = vec![
            listing("a", Some(1500), Some(225)),
            listing("b", None, None),
            listing("c", Some(1000), Some(150)),
        ];
        assert_eq!(cheapest_listing(&listings).unwrap().listingid, "c");
        assert!(cheapest_listing(&[listing("x", None, Some(3))]).is_none());
    }

    #[test]
    fn test_render_url_encodes_label() {
        let url = client().render_url("AK-47 | Redline (Field-Tested)").unwrap();
        let text = url.as_str();
        assert!(text.starts_with("https://steamcommunity.com/market/listings/730/AK-47%20"));
        assert!(!text.contains(' '));
        assert!(text.contains("/render/?query=&start=0&count=10&currency=1"));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "x", String::new()),
            ListingError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "x", String::new()),
            ListingError::Upstream(_)
        ));
        match classify_status(
            StatusCode::BAD_REQUEST,
            "float api",
            r#"{"error": "Invalid inspect link", "code": 2}"#.to_string(),
        ) {
            ListingError::Upstream(msg) => assert!(msg.contains("Invalid inspect link")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_link_without_network() {
        let err = client().resolve("https://example.com/not-a-link").await.unwrap_err();
        assert!(matches!(err, ListingError::InvalidReference(_)));
    }
}
