//! A [`cache_core::Backend`] adapter over [`reqwest`], behind the
//! `client-reqwest` feature — for embedders who want a batteries-included
//! client rather than hand-writing the trait themselves.

#[cfg(feature = "client-reqwest")]
mod reqwest_backend {
    use async_trait::async_trait;
    use cache_core::{
        CacheError, CancellationToken, HeaderList, RawRequest, RawResponse, Result, Route,
    };
    use log::debug;

    /// Adapts a [`reqwest::Client`] to [`cache_core::Backend`]. Cancellation
    /// is honored with a `tokio::select!` race against the in-flight send,
    /// since `reqwest` itself has no first-class cancellation token.
    pub struct ReqwestBackend {
        client: reqwest::Client,
    }

    impl ReqwestBackend {
        pub fn new(client: reqwest::Client) -> Self {
            ReqwestBackend { client }
        }
    }

    impl Default for ReqwestBackend {
        fn default() -> Self {
            ReqwestBackend::new(reqwest::Client::new())
        }
    }

    #[async_trait]
    impl cache_core::Backend for ReqwestBackend {
        async fn execute(
            &self,
            route: &Route,
            request: &RawRequest,
            cancellation: &CancellationToken,
        ) -> Result<RawResponse> {
            let url = format!("{}://{}{}", route.scheme, route.host, route.uri);
            let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
                .map_err(|_| CacheError::Backend(format!("unsupported method {}", request.method)))?;

            let mut builder = self.client.request(method, &url);
            for (name, value) in request.headers.iter() {
                builder = builder.header(name, value);
            }
            if let Some(body) = request.body.clone() {
                builder = builder.body(body);
            }

            debug!("dispatching {} {}", request.method, url);

            let send = builder.send();
            let response = tokio::select! {
                result = send => result.map_err(|err| CacheError::Backend(err.to_string()))?,
                _ = cancellation.cancelled() => return Err(CacheError::Cancelled),
            };

            let status = response.status();
            let mut headers = HeaderList::new();
            for (name, value) in response.headers().iter() {
                headers.append(name.clone(), value.clone());
            }
            let body = response.bytes().await.map_err(|err| CacheError::Backend(err.to_string()))?;

            Ok(RawResponse { status, headers, body: body.to_vec() })
        }
    }
}

#[cfg(feature = "client-reqwest")]
pub use reqwest_backend::ReqwestBackend;
