//! Fetching of `externalBody` content over HTTP.

use std::time::Duration;

use ureq::Agent;

use crate::error::LoadError;

/// Create HTTP agent with the specified timeout.
///
/// The timeout bounds the whole request, from connecting to reading the body.
pub(crate) fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Fetch `url` and return the response body as text.
///
/// The blocking request runs on tokio's blocking pool. Error statuses fail
/// with [`ureq::Error::StatusCode`].
pub(crate) async fn fetch_external_body(agent: &Agent, url: &str) -> Result<String, LoadError> {
    tracing::debug!(url, "Fetching external body");
    let agent = agent.clone();
    let owned_url = url.to_owned();
    let result = tokio::task::spawn_blocking(move || fetch_blocking(&agent, &owned_url))
        .await
        .unwrap_or_else(|e| Err(ureq::Error::Io(std::io::Error::other(e))));

    result.map_err(|source| LoadError::ExternalFetch {
        url: url.to_owned(),
        source,
    })
}

fn fetch_blocking(agent: &Agent, url: &str) -> Result<String, ureq::Error> {
    agent.get(url).call()?.into_body().read_to_string()
}

/// Append fetched text to a raw body, separated by a blank line.
pub(crate) fn append_body(raw_body: &mut String, external: &str) {
    if !raw_body.is_empty() {
        raw_body.push_str("\n\n");
    }
    raw_body.push_str(external);
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;

    /// Serve one canned HTTP response on a local port and return its URL.
    pub(crate) fn serve_once(status: &str, body: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/body.md")
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = serve_once("200 OK", "## External");
        let agent = create_agent(Duration::from_secs(5));
        let body = fetch_external_body(&agent, &url).await.unwrap();
        assert_eq!(body, "## External");
    }

    /// Accept one connection on a local port and never answer it.
    pub(crate) fn serve_silently() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((_stream, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(30));
            }
        });
        format!("http://{addr}/slow.md")
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let url = serve_once("404 Not Found", "missing");
        let agent = create_agent(Duration::from_secs(5));
        let err = fetch_external_body(&agent, &url).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::ExternalFetch {
                source: ureq::Error::StatusCode(404),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let agent = create_agent(Duration::from_secs(2));
        let err = fetch_external_body(&agent, "http://127.0.0.1:9/")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::ExternalFetch { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let url = serve_silently();
        let agent = create_agent(Duration::from_secs(1));

        let started = Instant::now();
        let err = fetch_external_body(&agent, &url).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(
            err,
            LoadError::ExternalFetch {
                source: ureq::Error::Timeout(_),
                ..
            }
        ));
    }

    #[test]
    fn test_append_body() {
        let mut body = String::new();
        append_body(&mut body, "ext");
        assert_eq!(body, "ext");

        let mut body = "local".to_owned();
        append_body(&mut body, "ext");
        assert_eq!(body, "local\n\next");
    }
}
