use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

use crate::config::{SiteConfig, SiteSelectors};
use crate::models::ProductRecord;
use crate::price::PriceParser;
use crate::utils::error::{AppError, Result};

/// Why a single listing was left out of the extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("empty {0}")]
    EmptyField(&'static str),

    #[error("unparsable price '{0}'")]
    UnparsablePrice(String),

    #[error("invalid url '{0}'")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedListing {
    /// Position of the listing among the matched containers.
    pub index: usize,
    pub reason: ListingError,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub listings_found: usize,
    pub products: Vec<ProductRecord>,
    pub skipped: Vec<SkippedListing>,
}

struct CompiledSelectors {
    product_container: Selector,
    url: Selector,
    title: Selector,
    prices: Vec<Selector>,
    original_price: Option<Selector>,
    image: Option<Selector>,
    discount: Option<Selector>,
    sold_out: Option<Selector>,
}

impl CompiledSelectors {
    fn compile(selectors: &SiteSelectors) -> Result<Self> {
        let optional = |s: &Option<String>| s.as_deref().map(compile).transpose();

        let mut prices = vec![compile(&selectors.price)?];
        for fallback in &selectors.price_fallbacks {
            prices.push(compile(fallback)?);
        }

        Ok(Self {
            product_container: compile(&selectors.product_container)?,
            url: compile(&selectors.url)?,
            title: compile(&selectors.title)?,
            prices,
            original_price: optional(&selectors.original_price)?,
            image: optional(&selectors.image)?,
            discount: optional(&selectors.discount)?,
            sold_out: optional(&selectors.sold_out)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AppError::Extraction(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

/// Turns a fetched listing page into product records.
pub struct ProductExtractor {
    selectors: CompiledSelectors,
    id_attribute: String,
    base_url: Url,
    prices: PriceParser,
}

impl ProductExtractor {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let base_url = Url::parse(&site.url).map_err(|e| AppError::Parse {
            message: format!("site url '{}': {}", site.url, e),
        })?;

        Ok(Self {
            selectors: CompiledSelectors::compile(&site.selectors)?,
            id_attribute: site.selectors.id_attribute.clone(),
            base_url,
            prices: PriceParser::with_default_currency(&site.default_currency),
        })
    }

    /// Extracts every listing it can. Unreadable listings are skipped and
    /// reported; only a page with no usable listing at all is an error.
    pub fn extract(&self, html: &str) -> Result<ExtractionReport> {
        let document = Html::parse_document(html);
        let mut report = ExtractionReport::default();

        for (index, element) in document.select(&self.selectors.product_container).enumerate() {
            report.listings_found += 1;
            match self.extract_listing(element) {
                Ok(product) => report.products.push(product),
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping listing");
                    report.skipped.push(SkippedListing { index, reason });
                }
            }
        }

        if report.listings_found == 0 {
            return Err(AppError::NoData(
                "no listings matched the product container selector; the page layout may have changed".into(),
            ));
        }

        if report.products.is_empty() {
            return Err(AppError::NoData(format!(
                "all {} listings were unparsable",
                report.listings_found
            )));
        }

        tracing::info!(
            found = report.listings_found,
            extracted = report.products.len(),
            skipped = report.skipped.len(),
            "extracted products"
        );
        Ok(report)
    }

    fn extract_listing(&self, element: ElementRef) -> std::result::Result<ProductRecord, ListingError> {
        // The link is often the container itself (`a.result`)
        let link = if self.selectors.url.matches(&element) {
            element
        } else {
            element
                .select(&self.selectors.url)
                .next()
                .ok_or(ListingError::MissingField("url"))?
        };

        let href = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or(ListingError::MissingField("url"))?;
        let url = self
            .base_url
            .join(href)
            .map_err(|_| ListingError::InvalidUrl(href.to_string()))?;

        let id = link
            .value()
            .attr(&self.id_attribute)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| id_from_url(&url))
            .ok_or(ListingError::MissingField("id"))?;

        let name = element
            .select(&self.selectors.title)
            .next()
            .map(text_of)
            .ok_or(ListingError::MissingField("title"))?;
        if name.is_empty() {
            return Err(ListingError::EmptyField("title"));
        }

        let (price, currency) = self.extract_price(element)?;

        let original_price = self
            .selectors
            .original_price
            .as_ref()
            .and_then(|selector| element.select(selector).next())
            .and_then(|el| self.prices.parse(&text_of(el)))
            .map(|(amount, _)| amount);

        let image = self
            .selectors
            .image
            .as_ref()
            .and_then(|selector| element.select(selector).next())
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .and_then(|src| self.base_url.join(src.trim()).ok())
            .map(String::from);

        let discount = self
            .selectors
            .discount
            .as_ref()
            .and_then(|selector| element.select(selector).next())
            .map(text_of)
            .filter(|text| !text.is_empty());

        let available = match &self.selectors.sold_out {
            Some(selector) => element.select(selector).next().is_none(),
            None => true,
        };

        Ok(ProductRecord {
            id,
            name,
            price,
            currency,
            available,
            url: url.into(),
            original_price,
            image,
            discount,
        })
    }

    fn extract_price(&self, element: ElementRef) -> std::result::Result<(rust_decimal::Decimal, String), ListingError> {
        let mut last_text = None;
        for selector in &self.selectors.prices {
            if let Some(price_element) = element.select(selector).next() {
                let text = text_of(price_element);
                if let Some(parsed) = self.prices.parse(&text) {
                    return Ok(parsed);
                }
                last_text = Some(text);
            }
        }

        match last_text {
            Some(text) => Err(ListingError::UnparsablePrice(text)),
            None => Err(ListingError::MissingField("price")),
        }
    }
}

fn text_of(element: ElementRef) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn id_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
