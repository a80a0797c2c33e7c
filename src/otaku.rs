//! A client for the [otakugifs.xyz](https://otakugifs.xyz) reaction GIF API.
//!
//! Usually, you prefer to use the [`Otaku`] struct to get the [`data`] from the API.

use std::sync::LazyLock;

use reqwest::{Client, IntoUrl, Url};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::tool::{ensure_base, PushSegment};
use crate::transport::{fetch, ResponseBuffer};

/// The URLs for the otakugifs API.
pub mod url {
    use super::*;

    /// The base URL of the otakugifs API.
    pub const BASE_URL: &str = "https://api.otakugifs.xyz/gif";

    /// [`BASE_URL`] parsed once.
    pub static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(BASE_URL).unwrap());

    /// The path segment listing every reaction.
    pub const ALL_REACTIONS: &str = "allreactions";
}

/// `{"reactions": [...]}`, the key is required.
#[derive(Deserialize, Serialize)]
pub(crate) struct ReactionsInner {
    pub(crate) reactions: Vec<String>,
}

impl From<ReactionsInner> for data::ReactionList {
    fn from(value: ReactionsInner) -> Self {
        Self(value.reactions)
    }
}

impl From<data::ReactionList> for ReactionsInner {
    fn from(value: data::ReactionList) -> Self {
        Self {
            reactions: value.0,
        }
    }
}

/// `{"url": "..."}`, the key is required.
#[derive(Deserialize)]
pub(crate) struct GifInner {
    pub(crate) url: String,
}

/// The data structures for the JSON responses from the otakugifs API.
pub mod data {
    use super::*;

    /// The container format of a reaction GIF.
    #[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Format {
        /// `gif`, the default.
        #[default]
        Gif,
        /// `webp`.
        Webp,
        /// `avif`.
        Avif,
    }

    impl Format {
        /// The value of the `format` query parameter.
        pub const fn as_tag(self) -> &'static str {
            match self {
                Format::Gif => "gif",
                Format::Webp => "webp",
                Format::Avif => "avif",
            }
        }

        /// Case-sensitive. Unknown tags fall back to [`Format::Gif`].
        pub fn from_tag(tag: &str) -> Self {
            match tag {
                "gif" => Format::Gif,
                "webp" => Format::Webp,
                "avif" => Format::Avif,
                other => {
                    warn!(tag = other, "unknown otakugifs format, falling back to gif");
                    Format::Gif
                }
            }
        }
    }

    impl std::fmt::Display for Format {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_tag())
        }
    }

    /// Every reaction name known by the API, in the order the API sent them.
    ///
    /// Duplicates are kept as-is.
    /// It serializes back to the `{"reactions": [...]}` shape it was read from.
    #[non_exhaustive]
    #[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
    #[serde(from = "ReactionsInner", into = "ReactionsInner")]
    pub struct ReactionList(pub(crate) Vec<String>);

    impl ReactionList {
        /// Exact, case-sensitive membership test.
        pub fn contains(&self, name: &str) -> bool {
            self.0.iter().any(|reaction| reaction == name)
        }

        /// The number of reactions, duplicates included.
        pub fn len(&self) -> usize {
            self.0.len()
        }

        /// Whether the API returned no reaction at all.
        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }

        /// The reactions in the order the API sent them.
        pub fn iter(&self) -> std::slice::Iter<'_, String> {
            self.0.iter()
        }

        /// Take the names out of the list.
        pub fn into_vec(self) -> Vec<String> {
            self.0
        }
    }

    impl From<Vec<String>> for ReactionList {
        fn from(value: Vec<String>) -> Self {
            Self(value)
        }
    }

    impl<'a> IntoIterator for &'a ReactionList {
        type Item = &'a String;
        type IntoIter = std::slice::Iter<'a, String>;

        fn into_iter(self) -> Self::IntoIter {
            self.0.iter()
        }
    }

    /// One reaction GIF.
    #[non_exhaustive]
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Gif {
        /// The format that was requested, the payload does not repeat it.
        pub format: Format,
        /// The URL of the file, see [`Otaku::download`].
        pub url: String,
    }
}

use data::{Format, Gif, ReactionList};

/// Parse the body of the `allreactions` endpoint.
///
/// # Errors
///
/// If the body is not a JSON object with a `reactions` array of strings.
pub fn parse_reactions(body: &[u8]) -> Result<ReactionList> {
    Ok(serde_json::from_slice(body)?)
}

/// Parse the body of a reaction request made with `format`.
///
/// # Errors
///
/// If the body is not a JSON object with a `url` string.
pub fn parse_gif(body: &[u8], format: Format) -> Result<Gif> {
    let GifInner { url } = serde_json::from_slice(body)?;
    Ok(Gif { format, url })
}

/// The otakugifs client.
///
/// # Example
///
/// ```no_run
/// use nekotaku::otaku::{data::Format, Otaku};
/// use reqwest::Client;
///
/// #[tokio::main]
/// async fn main() -> nekotaku::Result<()> {
///     let otaku = Otaku::new(Client::new());
///
///     let reactions = otaku.reactions().await?;
///     if reactions.contains("kiss") {
///         let gif = otaku.reaction("kiss", Format::Gif).await?;
///         let body = otaku.download(&gif.url).await?;
///         println!("{}: {} bytes", gif.url, body.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Otaku {
    client: Client,
    base_url: Url,
}

impl Otaku {
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

    /// The url of the `allreactions` endpoint.
    pub fn reactions_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.push_segment(url::ALL_REACTIONS);
        url
    }

    /// `reaction` is sent as-is, it is expected to be one of [`Self::reactions`].
    pub fn reaction_url(&self, reaction: &str, format: Format) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .extend_pairs([("reaction", reaction), ("format", format.as_tag())]);
        url
    }

    /// Get the list of all reactions.
    ///
    /// # Errors
    ///
    /// See [`crate::Error`].
    pub async fn reactions(&self) -> Result<ReactionList> {
        let body = fetch(&self.client, self.reactions_url()).await?;
        parse_reactions(body.as_bytes())
    }

    /// Get a random GIF of `reaction` in `format`.
    ///
    /// # Errors
    ///
    /// See [`crate::Error`].
    pub async fn reaction(&self, reaction: &str, format: Format) -> Result<Gif> {
        let body = fetch(&self.client, self.reaction_url(reaction, format)).await?;
        parse_gif(body.as_bytes(), format)
    }

    /// Download the raw bytes of `url`, usually [`Gif::url`].
    ///
    /// # Errors
    ///
    /// [`crate::Error::Transport`] or [`crate::Error::Memory`], the body is never parsed.
    pub async fn download(&self, url: impl IntoUrl) -> Result<ResponseBuffer> {
        fetch(&self.client, url).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ErrorKind;

    async fn mock_otaku() -> (MockServer, Otaku) {
        let server = MockServer::start().await;
        let otaku = Otaku::with_base_url(Client::new(), &format!("{}/gif", server.uri())).unwrap();
        (server, otaku)
    }

    #[test]
    fn test_format_tags() {
        for format in [Format::Gif, Format::Webp, Format::Avif] {
            assert_eq!(Format::from_tag(format.as_tag()), format);
        }
        assert_eq!(Format::Avif.as_tag(), "avif");
        assert_eq!(Format::from_tag("AVIF"), Format::Gif);
        assert_eq!(Format::from_tag("png"), Format::Gif);
    }

    #[test]
    fn test_reaction_url() {
        let otaku = Otaku::new(Client::new());
        assert_eq!(
            otaku.reaction_url("kiss", Format::Avif).as_str(),
            "https://api.otakugifs.xyz/gif?reaction=kiss&format=avif"
        );
        assert_eq!(
            otaku.reaction_url("hug", Format::Webp).as_str(),
            "https://api.otakugifs.xyz/gif?reaction=hug&format=webp"
        );
        assert_eq!(
            otaku.reactions_url().as_str(),
            "https://api.otakugifs.xyz/gif/allreactions"
        );
    }

    #[test]
    fn test_parse_reactions() {
        let list = parse_reactions(br#"{"reactions": ["kiss", "hug", "kiss"]}"#).unwrap();
        assert_eq!(list.len(), 3);
        for reaction in ["kiss", "hug"] {
            assert!(list.contains(reaction));
        }
        assert!(!list.contains("Kiss"));
        assert!(!list.contains("ki"));
    }

    #[test]
    fn test_parse_reactions_missing_key() {
        let err = parse_reactions(br#"{"reaction": []}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = parse_reactions(br#"["kiss"]"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = parse_reactions(b"<html></html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_reactions_serialize_as_parsed() {
        let list = parse_reactions(br#"{"reactions": ["kiss", "hug", "kiss"]}"#).unwrap();
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"{"reactions":["kiss","hug","kiss"]}"#);
        assert_eq!(parse_reactions(json.as_bytes()).unwrap(), list);
    }

    #[test]
    fn test_empty_list_contains_nothing() {
        let list = parse_reactions(br#"{"reactions": []}"#).unwrap();
        assert!(list.is_empty());
        assert!(!list.contains(""));
        assert!(!ReactionList::default().contains("kiss"));
    }

    #[test]
    fn test_parse_gif() {
        let body = br#"{"url": "https://cdn.otakugifs.xyz/gifs/kiss/a.webp"}"#;
        let gif = parse_gif(body, Format::Webp).unwrap();
        assert_eq!(gif.format, Format::Webp);
        assert_eq!(gif.url, "https://cdn.otakugifs.xyz/gifs/kiss/a.webp");

        let err = parse_gif(br#"{"error": "no such reaction"}"#, Format::Gif).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_reactions() {
        let (server, otaku) = mock_otaku().await;
        Mock::given(method("GET"))
            .and(path("/gif/allreactions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"reactions": ["airkiss", "kiss"]})),
            )
            .mount(&server)
            .await;

        let reactions = otaku.reactions().await.unwrap();
        assert_eq!(reactions.len(), 2);
        assert!(reactions.iter().all(|name| reactions.contains(name)));
    }

    #[tokio::test]
    async fn test_reaction() {
        let (server, otaku) = mock_otaku().await;
        Mock::given(method("GET"))
            .and(path("/gif"))
            .and(query_param("reaction", "kiss"))
            .and(query_param("format", "avif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"url": "https://cdn.otakugifs.xyz/gifs/kiss/a.avif"})),
            )
            .mount(&server)
            .await;

        let gif = otaku.reaction("kiss", Format::Avif).await.unwrap();
        assert_eq!(gif.format, Format::Avif);
        assert_eq!(gif.url, "https://cdn.otakugifs.xyz/gifs/kiss/a.avif");

        // independent calls never share their results
        let again = otaku.reaction("kiss", Format::Avif).await.unwrap();
        drop(gif);
        assert_eq!(again.url, "https://cdn.otakugifs.xyz/gifs/kiss/a.avif");
    }

    #[tokio::test]
    async fn test_download() {
        const BODY: &[u8] = b"\x00\x01\x02\x00";

        let (server, otaku) = mock_otaku().await;
        Mock::given(method("GET"))
            .and(path("/gifs/kiss/a.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
            .mount(&server)
            .await;

        let body = otaku
            .download(format!("{}/gifs/kiss/a.gif", server.uri()))
            .await
            .unwrap();
        assert_eq!(body.as_bytes(), BODY);
    }

    #[tokio::test]
    #[ignore = "requires network"]
    async fn test_live_reactions() -> Result<()> {
        let otaku = Otaku::new(Client::new());

        let reactions = otaku.reactions().await?;
        assert!(!reactions.is_empty());
        assert!(reactions.contains("kiss"));

        let gif = otaku.reaction("kiss", Format::Gif).await?;
        assert_eq!(gif.format, Format::Gif);
        assert!(gif.url.starts_with("https://cdn.otakugifs.xyz/"));
        Ok(())
    }
}
