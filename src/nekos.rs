//! A client for the [nekos.best](https://nekos.best) image API.
//!
//! Usually, you prefer to use the [`Nekos`] struct to list the [`data::EndpointList`],
//! then [`Category`] or [`Search`] to get the [`data::Image`]s.

use std::fmt;
use std::sync::LazyLock;

use reqwest::{Client, Url};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::tool::{ensure_base, PushSegment};
use crate::transport::fetch;

/// The URLs for the nekos.best API.
pub mod url {
    use super::*;

    /// The base URL of the nekos.best API, version 2.
    pub const BASE_URL: &str = "https://nekos.best/api/v2/";

    /// [`BASE_URL`] parsed once.
    pub static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(BASE_URL).unwrap());

    /// The path segment listing every endpoint.
    pub const ENDPOINTS: &str = "endpoints";

    /// The path segment of the search endpoint.
    pub const SEARCH: &str = "search";
}

/// The most images the API returns for one request.
pub const MAX_AMOUNT: u8 = 20;

/// The value of each entry of the `endpoints` object.
#[derive(Deserialize)]
pub(crate) struct EndpointInner {
    pub(crate) format: String,
}

/// [`EndpointInner`] on the way out.
#[derive(Serialize)]
pub(crate) struct EndpointOuter {
    pub(crate) format: data::Format,
}

/// An entry of a category or search response of a gif endpoint.
#[derive(Deserialize)]
pub(crate) struct GifInner {
    pub(crate) anime_name: String,
    pub(crate) url: String,
}

/// An entry of a category or search response of a png endpoint.
#[derive(Deserialize)]
pub(crate) struct PngInner {
    pub(crate) artist_name: String,
    pub(crate) artist_href: String,
    pub(crate) source_url: String,
    pub(crate) url: String,
}

/// The live API wraps the entries in `{"results": [...]}`, a bare array is accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ResultsInner<T> {
    Wrapped { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ResultsInner<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ResultsInner::Wrapped { results } => results,
            ResultsInner::Bare(results) => results,
        }
    }
}

impl From<GifInner> for data::Image {
    fn from(value: GifInner) -> Self {
        Self {
            url: value.url,
            source: data::Source::Gif {
                anime_name: value.anime_name,
            },
        }
    }
}

impl From<PngInner> for data::Image {
    fn from(value: PngInner) -> Self {
        Self {
            url: value.url,
            source: data::Source::Png {
                artist_name: value.artist_name,
                artist_href: value.artist_href,
                source_url: value.source_url,
            },
        }
    }
}

/// The data structures for the JSON responses from the nekos.best API.
pub mod data {
    use super::*;

    /// The kind of image an endpoint serves.
    #[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Format {
        /// Still images, with artist information.
        Png,
        /// Animated images, with the anime they come from.
        Gif,
    }

    impl Format {
        /// The tag used by the `endpoints` listing.
        pub const fn as_tag(self) -> &'static str {
            match self {
                Format::Png => "png",
                Format::Gif => "gif",
            }
        }

        /// Case-sensitive: only `"png"` is [`Format::Png`], anything else is [`Format::Gif`].
        pub fn from_tag(tag: &str) -> Self {
            match tag {
                "png" => Format::Png,
                "gif" => Format::Gif,
                other => {
                    warn!(tag = other, "unknown nekos.best format, falling back to gif");
                    Format::Gif
                }
            }
        }

        /// The value of the `type` query parameter of the search endpoint.
        pub const fn search_type(self) -> &'static str {
            match self {
                Format::Png => "1",
                Format::Gif => "2",
            }
        }
    }

    impl fmt::Display for Format {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_tag())
        }
    }

    /// A named category of images, e.g. `neko` or `hug`.
    #[non_exhaustive]
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Endpoint {
        /// The path segment of the endpoint.
        pub name: String,
        /// What the endpoint serves.
        pub format: Format,
    }

    /// The endpoints of the API: an ordered mapping from endpoint name to [`Format`].
    ///
    /// The order is the order of the keys in the response object.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct EndpointList(pub(crate) Vec<Endpoint>);

    impl EndpointList {
        /// The first endpoint called `name`.
        pub fn get(&self, name: &str) -> Option<&Endpoint> {
            self.0.iter().find(|endpoint| endpoint.name == name)
        }

        /// Exact, case-sensitive.
        pub fn contains(&self, name: &str) -> bool {
            self.get(name).is_some()
        }

        /// The number of endpoints.
        pub fn len(&self) -> usize {
            self.0.len()
        }

        /// Whether the API listed no endpoint.
        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }

        /// The endpoints in the order of the response.
        pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
            self.0.iter()
        }

        /// Take the endpoints out of the list.
        pub fn into_vec(self) -> Vec<Endpoint> {
            self.0
        }
    }

    impl<'a> IntoIterator for &'a EndpointList {
        type Item = &'a Endpoint;
        type IntoIter = std::slice::Iter<'a, Endpoint>;

        fn into_iter(self) -> Self::IntoIter {
            self.0.iter()
        }
    }

    /// The keys of the object are the endpoint names, so we walk the entries ourselves
    /// to keep both the names and their order.
    impl<'de> Deserialize<'de> for EndpointList {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct EndpointsVisitor;

            impl<'de> Visitor<'de> for EndpointsVisitor {
                type Value = EndpointList;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("an object of endpoint name to {\"format\": ...}")
                }

                fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
                where
                    A: MapAccess<'de>,
                {
                    let mut endpoints = Vec::with_capacity(map.size_hint().unwrap_or(0));
                    while let Some((name, EndpointInner { format })) =
                        map.next_entry::<String, EndpointInner>()?
                    {
                        endpoints.push(Endpoint {
                            name,
                            format: Format::from_tag(&format),
                        });
                    }
                    Ok(EndpointList(endpoints))
                }
            }

            deserializer.deserialize_map(EndpointsVisitor)
        }
    }

    /// Written back as the same object it was read from.
    impl Serialize for EndpointList {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut map = serializer.serialize_map(Some(self.0.len()))?;
            for endpoint in &self.0 {
                map.serialize_entry(
                    &endpoint.name,
                    &EndpointOuter {
                        format: endpoint.format,
                    },
                )?;
            }
            map.end()
        }
    }

    /// Where an [`Image`] comes from.
    ///
    /// The variant is decided by the [`Format`] of the request, the payload does not say it.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    #[serde(untagged)]
    pub enum Source {
        /// See [`Format::Gif`].
        Gif {
            /// The anime the clip is taken from.
            anime_name: String,
        },
        /// See [`Format::Png`].
        Png {
            /// The artist of the picture.
            artist_name: String,
            /// A link to the artist's page.
            artist_href: String,
            /// Where the picture was first posted.
            source_url: String,
        },
    }

    /// One image of a category or search response.
    #[non_exhaustive]
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Image {
        /// The URL of the file.
        pub url: String,
        /// The fields that depend on the format.
        pub source: Source,
    }

    impl Image {
        /// The format of the request that produced this image.
        pub fn format(&self) -> Format {
            match self.source {
                Source::Gif { .. } => Format::Gif,
                Source::Png { .. } => Format::Png,
            }
        }
    }
}

use data::{Endpoint, EndpointList, Format, Image};

/// Parse the body of the `endpoints` endpoint.
///
/// # Errors
///
/// If the body is not a JSON object whose values all carry a `format` string.
pub fn parse_endpoints(body: &[u8]) -> Result<EndpointList> {
    Ok(serde_json::from_slice(body)?)
}

/// Parse the body of a category or search request made for `format`.
///
/// # Errors
///
/// If the body is not an array of entries (bare, or under `results`),
/// or an entry lacks one of the fields `format` requires.
pub fn parse_images(body: &[u8], format: Format) -> Result<Vec<Image>> {
    let images = match format {
        Format::Png => serde_json::from_slice::<ResultsInner<PngInner>>(body)?
            .into_vec()
            .into_iter()
            .map(Image::from)
            .collect(),
        Format::Gif => serde_json::from_slice::<ResultsInner<GifInner>>(body)?
            .into_vec()
            .into_iter()
            .map(Image::from)
            .collect(),
    };
    Ok(images)
}

#[inline]
fn check_amount(amount: u8) -> anyhow::Result<()> {
    if !matches!(amount, 1..=MAX_AMOUNT) {
        return Err(anyhow::anyhow!("Amount can only be between 1 and {MAX_AMOUNT}"));
    }
    Ok(())
}

/// The nekos.best client.
///
/// # Example
///
/// ```no_run
/// use nekotaku::nekos::Nekos;
/// use reqwest::Client;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let nekos = Nekos::new(Client::new());
///
///     let endpoints = nekos.endpoints().await?;
///     let neko = endpoints.get("neko").expect("no such endpoint");
///
///     for image in nekos.category(neko, 3)?.run().await? {
///         println!("{}", image.url);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Nekos {
    client: Client,
    base_url: Url,
}

impl Nekos {
    /// Use the public API at [`url::BASE_URL`].
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: url::BASE.clone(),
        }
    }

    /// Use another deployment of the API, e.g. a mirror.
    ///
    /// # Errors
    ///
    /// If `base_url` is not an absolute url that can carry a path.
    pub fn with_base_url(client: Client, base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            base_url: ensure_base(base_url)?,
        })
    }

    /// The url of the `endpoints` listing.
    pub fn endpoints_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.push_segment(url::ENDPOINTS);
        url
    }

    /// Get every endpoint with its format.
    ///
    /// # Errors
    ///
    /// See [`crate::Error`].
    pub async fn endpoints(&self) -> Result<EndpointList> {
        let body = fetch(&self.client, self.endpoints_url()).await?;
        parse_endpoints(body.as_bytes())
    }

    /// See [`Category::build`].
    pub fn category<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        amount: u8,
    ) -> anyhow::Result<Category<'a>> {
        Category::build(self, endpoint, amount)
    }

    /// See [`Search::build`].
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        amount: u8,
        format: Format,
        category: Option<&'a Endpoint>,
    ) -> anyhow::Result<Search<'a>> {
        Search::build(self, query, amount, format, category)
    }
}

/// A Consuming-Builders style request for random images of one endpoint.
pub struct Category<'a> {
    nekos: &'a Nekos,
    endpoint: &'a Endpoint,
    amount: u8,
}

impl Category<'_> {
    /// # Errors
    ///
    /// If `amount` is not in the range `1..=MAX_AMOUNT`.
    pub fn build<'a>(
        nekos: &'a Nekos,
        endpoint: &'a Endpoint,
        amount: u8,
    ) -> anyhow::Result<Category<'a>> {
        check_amount(amount)?;
        Ok(Category {
            nekos,
            endpoint,
            amount,
        })
    }

    /// `<base>/<endpoint>?amount=<amount>`.
    pub fn url(&self) -> Url {
        let mut url = self.nekos.base_url.clone();
        url.push_segment(&self.endpoint.name);
        url.query_pairs_mut()
            .append_pair("amount", &self.amount.to_string());
        url
    }

    /// Send the request, the images are parsed by the endpoint's format.
    ///
    /// # Errors
    ///
    /// See [`crate::Error`].
    pub async fn run(self) -> Result<Vec<Image>> {
        let body = fetch(&self.nekos.client, self.url()).await?;
        parse_images(body.as_bytes(), self.endpoint.format)
    }
}

/// A Consuming-Builders style request searching images by name.
pub struct Search<'a> {
    nekos: &'a Nekos,
    query: &'a str,
    amount: u8,
    format: Format,
    category: Option<&'a Endpoint>,
}

impl Search<'_> {
    /// `query` is matched against the artist or anime name, depending on `format`.
    ///
    /// # Errors
    ///
    /// If `query` is empty, `amount` is not in the range `1..=MAX_AMOUNT`,
    /// or `category` does not serve `format`.
    pub fn build<'a>(
        nekos: &'a Nekos,
        query: &'a str,
        amount: u8,
        format: Format,
        category: Option<&'a Endpoint>,
    ) -> anyhow::Result<Search<'a>> {
        if query.is_empty() {
            return Err(anyhow::anyhow!("Query cannot be empty"));
        }
        check_amount(amount)?;
        if let Some(category) = category {
            if category.format != format {
                return Err(anyhow::anyhow!(
                    "Category `{}` serves {}, not {format}",
                    category.name,
                    category.format
                ));
            }
        }
        Ok(Search {
            nekos,
            query,
            amount,
            format,
            category,
        })
    }

    /// `<base>/search?query=..&amount=..&type=..`, then `&category=..` if any.
    pub fn url(&self) -> Url {
        let mut url = self.nekos.base_url.clone();
        url.push_segment(url::SEARCH);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.extend_pairs([
                ("query", self.query),
                ("amount", &self.amount.to_string()),
                ("type", self.format.search_type()),
            ]);
            if let Some(category) = self.category {
                pairs.append_pair("category", &category.name);
            }
        }
        url
    }

    /// Send the request, the images are parsed by the requested format.
    ///
    /// # Errors
    ///
    /// See [`crate::Error`].
    pub async fn run(self) -> Result<Vec<Image>> {
        let body = fetch(&self.nekos.client, self.url()).await?;
        parse_images(body.as_bytes(), self.format)
    }
}
