//! Candidate image URL validation.
//!
//! Answers "does this URL serve actual image bytes?" with a bounded network
//! budget: a HEAD request first (free), then a GET capped to the first ~96
//! bytes, then byte-sniffing as the ground truth. Any network failure or
//! timeout collapses to "not an image" — a candidate that errors out is
//! dropped, never allowed to fail the surrounding analysis run.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RANGE};

use crate::sniff;

/// How many leading bytes the ranged GET asks for. Enough for every
/// signature in [`sniff`], including the 12-byte container formats.
pub const PROBE_BYTES: u64 = 96;

/// Internal probe result. The public contract collapses to a boolean, but
/// transport failures are kept distinct so they can be logged.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The URL serves image content; records what convinced us.
    Image(ProbeEvidence),
    /// The URL is reachable but does not serve image content.
    NotImage,
    /// The URL could not be probed (bad scheme, network error, timeout).
    TransportError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvidence {
    /// HEAD response carried an `image/*` content type.
    HeadContentType,
    /// GET response carried an `image/*` content type.
    GetContentType,
    /// GET response bytes matched a known image signature.
    SniffedBytes,
}

/// Validates candidate image URLs. One instance holds one HTTP client and a
/// per-URL wall-clock budget covering all attempts for that URL combined.
pub struct UrlValidator {
    client: reqwest::Client,
    timeout: Duration,
}

/// Seam for code that only needs the boolean answer. Lets the extraction
/// pipeline run against a stub in tests instead of a live network.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn is_image(&self, url: &str) -> bool;
}

impl UrlValidator {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        // The per-request timeout is the backstop; the real bound is the
        // outer tokio timeout in probe().
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Probe a URL, never raising: the outcome enum absorbs every failure.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        if !has_http_scheme(url) {
            return ProbeOutcome::TransportError(format!("not an http(s) url: {:?}", url));
        }

        match tokio::time::timeout(self.timeout, self.probe_inner(url)).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::TransportError(format!(
                "probe timed out after {:?}",
                self.timeout
            )),
        }
    }

    async fn probe_inner(&self, url: &str) -> ProbeOutcome {
        // Stage 1: HEAD. Redirects are followed by the client's default
        // policy. Many hosts omit or mislabel Content-Type here, so a
        // non-image answer is not final.
        if let Ok(resp) = self.client.head(url).send().await {
            if resp.status().is_success() && content_type_is_image(header_value(&resp)) {
                return ProbeOutcome::Image(ProbeEvidence::HeadContentType);
            }
        }

        // Stage 2: ranged GET for the leading bytes.
        let mut resp = match self
            .client
            .get(url)
            .header(RANGE, format!("bytes=0-{}", PROBE_BYTES - 1))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return ProbeOutcome::TransportError(e.to_string()),
        };

        if !resp.status().is_success() {
            return ProbeOutcome::NotImage;
        }

        let content_type = header_value(&resp);
        if content_type_is_image(content_type.clone()) {
            return ProbeOutcome::Image(ProbeEvidence::GetContentType);
        }

        // Stage 3: sniff the bytes we already paid for. Servers that
        // ignore the Range header send the full body, so read at most
        // PROBE_BYTES from the stream — the sniffer only looks at the
        // leading bytes anyway.
        let mut bytes: Vec<u8> = Vec::with_capacity(PROBE_BYTES as usize);
        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    bytes.extend_from_slice(&chunk);
                    if bytes.len() as u64 >= PROBE_BYTES {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => return ProbeOutcome::TransportError(e.to_string()),
            }
        }

        match classify_bytes(&bytes) {
            Some(evidence) => ProbeOutcome::Image(evidence),
            None => ProbeOutcome::NotImage,
        }
    }
}

/// URL schemes are case-insensitive, so `HTTP://` is as valid as `http://`.
fn has_http_scheme(url: &str) -> bool {
    let bytes = url.as_bytes();
    (bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"http://"))
        || (bytes.len() >= 8 && bytes[..8].eq_ignore_ascii_case(b"https://"))
}

#[async_trait]
impl ImageProbe for UrlValidator {
    /// Collapse the probe outcome to the public boolean contract.
    async fn is_image(&self, url: &str) -> bool {
        match self.probe(url).await {
            ProbeOutcome::Image(evidence) => {
                tracing::debug!(url, ?evidence, "candidate url validated as image");
                true
            }
            ProbeOutcome::NotImage => false,
            ProbeOutcome::TransportError(msg) => {
                tracing::debug!(url, error = %msg, "candidate url probe failed, treating as non-image");
                false
            }
        }
    }
}

fn header_value(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// A `Content-Type` counts iff it starts with `image/`.
fn content_type_is_image(content_type: Option<String>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// Byte-level fallback decision, split out so the HEAD-without-content-type
/// path is testable without a network.
fn classify_bytes(bytes: &[u8]) -> Option<ProbeEvidence> {
    sniff::sniff(bytes).map(|_| ProbeEvidence::SniffedBytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    const PNG_HEADER: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    /// Minimal loopback HTTP server: answers each connection with whatever
    /// `respond` returns for the request method, then closes it.
    fn spawn_server<F>(respond: F) -> String
    where
        F: Fn(&str) -> Vec<u8> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(match stream.try_clone() {
                    Ok(clone) => clone,
                    Err(_) => continue,
                });
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                // Drain the request headers.
                let mut line = String::new();
                while reader.read_line(&mut line).is_ok() {
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    line.clear();
                }
                let method = request_line.split_whitespace().next().unwrap_or("");
                let _ = stream.write_all(&respond(method));
            }
        });
        format!("http://{}", addr)
    }

    fn http_response(content_type: Option<&str>, body: &[u8]) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n",
            body.len()
        );
        if let Some(ct) = content_type {
            head.push_str(&format!("Content-Type: {}\r\n", ct));
        }
        head.push_str("\r\n");
        let mut response = head.into_bytes();
        response.extend_from_slice(body);
        response
    }

    fn validator() -> UrlValidator {
        UrlValidator::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn rejects_empty_and_non_http_urls_without_network() {
        let validator = UrlValidator::new(Duration::from_secs(1)).unwrap();
        assert!(!validator.is_image("").await);
        assert!(!validator.is_image("ftp://example.com/a.png").await);
        assert!(!validator.is_image("javascript:alert(1)").await);
        assert!(!validator.is_image("/relative/path.jpg").await);
    }

    #[test]
    fn content_type_match_is_prefix_and_case_insensitive() {
        assert!(content_type_is_image(Some("image/png".to_string())));
        assert!(content_type_is_image(Some("image/jpeg; charset=binary".to_string())));
        assert!(content_type_is_image(Some("IMAGE/WebP".to_string())));
        assert!(!content_type_is_image(Some("text/html".to_string())));
        assert!(!content_type_is_image(Some("application/octet-stream".to_string())));
        assert!(!content_type_is_image(None));
    }

    #[test]
    fn byte_fallback_accepts_png_header_without_content_type() {
        // A host answering HEAD with no Content-Type but serving real PNG
        // bytes on GET must still validate.
        assert!(!content_type_is_image(None));
        assert_eq!(classify_bytes(&PNG_HEADER), Some(ProbeEvidence::SniffedBytes));
    }

    #[test]
    fn byte_fallback_rejects_html() {
        assert_eq!(classify_bytes(b"<!DOCTYPE html><html>"), None);
    }

    #[test]
    fn scheme_check_is_case_insensitive() {
        assert!(has_http_scheme("http://example.com/a.png"));
        assert!(has_http_scheme("HTTP://example.com/a.png"));
        assert!(has_http_scheme("HtTpS://example.com/a.png"));
        assert!(!has_http_scheme("ftp://example.com/a.png"));
        assert!(!has_http_scheme("httpx://example.com/a.png"));
        assert!(!has_http_scheme(""));
    }

    #[tokio::test]
    async fn head_without_content_type_falls_back_to_get_and_sniffs() {
        // HEAD answers 200 with no Content-Type; GET serves PNG bytes,
        // also without a Content-Type. Only the sniffer can say yes here.
        let base = spawn_server(|method| match method {
            "HEAD" => http_response(None, b""),
            _ => http_response(None, &PNG_HEADER),
        });
        let url = format!("{}/photo", base);
        assert!(validator().is_image(&url).await);
    }

    #[tokio::test]
    async fn get_content_type_is_trusted_before_sniffing() {
        let base = spawn_server(|method| match method {
            "HEAD" => http_response(None, b""),
            _ => http_response(Some("image/png"), b"irrelevant"),
        });
        let url = format!("{}/photo", base);
        assert!(validator().is_image(&url).await);
    }

    #[tokio::test]
    async fn html_body_without_content_type_is_rejected() {
        let base = spawn_server(|method| match method {
            "HEAD" => http_response(None, b""),
            _ => http_response(None, b"<!DOCTYPE html><html><body>404</body></html>"),
        });
        let url = format!("{}/photo", base);
        assert!(!validator().is_image(&url).await);
    }

    #[tokio::test]
    async fn uppercase_scheme_url_still_validates() {
        let base = spawn_server(|method| match method {
            "HEAD" => http_response(None, b""),
            _ => http_response(None, &PNG_HEADER),
        });
        let url = format!("HTTP{}/photo", base.trim_start_matches("http"));
        assert!(validator().is_image(&url).await);
    }

    #[tokio::test]
    async fn range_ignoring_server_still_validates_from_leading_bytes() {
        // Server sends the whole body regardless of the Range header; the
        // probe reads only the leading bytes and stops.
        let base = spawn_server(|method| match method {
            "HEAD" => http_response(None, b""),
            _ => {
                let mut body = PNG_HEADER.to_vec();
                body.resize(1024 * 1024, 0);
                http_response(None, &body)
            }
        });
        let url = format!("{}/photo", base);
        assert!(validator().is_image(&url).await);
    }
}
