//! The single-shot GET used by every request of this crate.
//!
//! See [`fetch`] for the common case, and [`Fetch`] if you want to observe the download progress.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Weak;

use reqwest::{Client, IntoUrl};
use tracing::{debug, trace};

use crate::error::Result;

/// The raw body of one HTTP response.
///
/// It is plain bytes, not a string: binary downloads may contain zero bytes anywhere.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
}

impl ResponseBuffer {
    /// Append a chunk, growing the buffer to exactly the new cumulative length.
    fn append(&mut self, chunk: &[u8]) -> Result<()> {
        self.bytes.try_reserve_exact(chunk.len())?;
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    /// The number of bytes received.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the body was empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The body as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the body out without copying.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for ResponseBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A Consuming-Builders style GET request.
///
/// # Example
///
/// ```no_run
/// use std::sync::atomic::AtomicUsize;
/// use std::sync::Arc;
///
/// use nekotaku::transport::Fetch;
/// use reqwest::Client;
///
/// #[tokio::main]
/// async fn main() -> nekotaku::Result<()> {
///     let client = Client::new();
///     let data_cursor = Arc::new(AtomicUsize::new(0));
///
///     let body = Fetch::new(&client, "https://cdn.otakugifs.xyz/gifs/kiss/NGLVWgfzrI.gif")
///         .add_data_cursor(Arc::downgrade(&data_cursor))
///         .build()
///         .await?;
///
///     println!("{} bytes", body.len());
///     Ok(())
/// }
/// ```
pub struct Fetch<U>
where
    U: IntoUrl,
{
    client: Client,
    url: U,
    data_cursor: Option<Weak<AtomicUsize>>,
}

impl<U> Fetch<U>
where
    U: IntoUrl,
{
    /// The `client` is cheap to clone, its connection pool is shared.
    pub fn new(client: &Client, url: U) -> Self {
        Self {
            client: client.clone(),
            url,
            data_cursor: None,
        }
    }

    /// Every received chunk will add its length to `data_cursor`, as long as it is alive.
    pub fn add_data_cursor(mut self, data_cursor: Weak<AtomicUsize>) -> Self {
        self.data_cursor = Some(data_cursor);
        self
    }

    /// Send the request and accumulate the whole body.
    ///
    /// The status code is not interpreted: any completed transfer is a success.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Transport`] if the url is invalid or the transfer fails.
    /// - [`crate::Error::Memory`] if the buffer can not grow; the transfer is aborted.
    pub fn build(self) -> impl Future<Output = Result<ResponseBuffer>> {
        let Self {
            client,
            url,
            data_cursor,
        } = self;

        async move {
            let url = url.into_url()?;
            debug!(%url, "GET");
            let mut response = client.get(url).send().await?;
            debug!(status = %response.status(), "response headers received");

            let mut buffer = ResponseBuffer::default();
            while let Some(chunk) = response.chunk().await? {
                trace!(len = chunk.len(), "chunk received");
                buffer.append(&chunk)?;

                if let Some(data_cursor) = data_cursor.as_ref().and_then(Weak::upgrade) {
                    data_cursor.fetch_add(chunk.len(), Ordering::Release);
                }
            }

            debug!(len = buffer.len(), "response body received");
            Ok(buffer)
        }
    }
}

/// Perform one GET and return the complete body.
///
/// See [`Fetch::build`] for errors.
pub async fn fetch(client: &Client, url: impl IntoUrl) -> Result<ResponseBuffer> {
    Fetch::new(client, url).build().await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ErrorKind;

    const BINARY: &[u8] = b"GIF89a\x00\x01\x00\x00\xff\x00rest\x00";

    #[test]
    fn test_append_grows_exactly() {
        let mut buffer = ResponseBuffer::default();
        buffer.append(b"abc").unwrap();
        buffer.append(b"").unwrap();
        buffer.append(b"\x00d").unwrap();
        assert_eq!(buffer.as_bytes(), b"abc\x00d");
        assert_eq!(buffer.len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_binary_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/image.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(BINARY))
            .mount(&server)
            .await;

        let body = fetch(&Client::new(), format!("{}/image.gif", server.uri()))
            .await
            .unwrap();
        assert_eq!(body.len(), BINARY.len());
        assert_eq!(body.as_bytes(), BINARY);
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let body = fetch(&Client::new(), server.uri()).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let body = fetch(&Client::new(), server.uri()).await.unwrap();
        assert_eq!(body.as_bytes(), b"not found");
    }

    #[tokio::test]
    async fn test_transport_error() {
        // bind then drop, so that nothing is listening on this port
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let err = fetch(&Client::new(), format!("http://{addr}/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = fetch(&Client::new(), "not a url").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_fetch_with_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(BINARY))
            .mount(&server)
            .await;

        let client = Client::new();
        let data_cursor = Arc::new(AtomicUsize::new(0));
        Fetch::new(&client, server.uri())
            .add_data_cursor(Arc::downgrade(&data_cursor))
            .build()
            .await
            .unwrap();
        assert_eq!(data_cursor.load(Ordering::Acquire), BINARY.len());

        // a dropped cursor must not break the request
        let future = Fetch::new(&client, server.uri())
            .add_data_cursor(Arc::downgrade(&data_cursor))
            .build();
        drop(data_cursor);
        future.await.expect("Data cursor weak reference failed");
    }

    #[tokio::test]
    #[ignore = "requires network"]
    async fn test_download_known_size() {
        const URL: &str = "https://cdn.otakugifs.xyz/gifs/kiss/NGLVWgfzrI.gif";
        const SIZE: usize = 608_706;

        let body = fetch(&Client::new(), URL).await.unwrap();
        assert_eq!(body.len(), SIZE);
    }
}
