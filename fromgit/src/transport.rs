//! Network access: archive downloads over HTTPS and remote ref listings.

use std::fs;
use std::io;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;

use crate::error::TransportError;
use crate::git::{self, RemoteRef};
use crate::Error;

/// Redirect chains longer than this are abandoned.
pub const MAX_REDIRECTS: usize = 10;

/// The operations the engine needs from the network.
pub trait Transport: Send + Sync {
    /// List the refs of the repository at `url`.
    fn list_refs(&self, url: &str) -> Result<Vec<RemoteRef>, Error>;

    /// Stream the body at `url` into `dest`, tunnelling through `proxy` when given.
    fn download(&self, url: &str, dest: &Path, proxy: Option<&str>) -> Result<(), TransportError>;
}

/// Downloads with `reqwest` and lists refs with `git ls-remote`.
#[derive(Debug, Default)]
pub struct HttpTransport;

impl HttpTransport {
    fn client(proxy: Option<&str>) -> Result<Client, TransportError> {
        // Only the configured proxy is used, never one picked up from the environment
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .no_proxy()
            .user_agent(concat!("fromgit/", env!("CARGO_PKG_VERSION")));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }
        Ok(builder.build()?)
    }
}

impl Transport for HttpTransport {
    fn list_refs(&self, url: &str) -> Result<Vec<RemoteRef>, Error> {
        git::ls_remote(url)
    }

    fn download(&self, url: &str, dest: &Path, proxy: Option<&str>) -> Result<(), TransportError> {
        let client = Self::client(proxy)?;
        let mut current = url::Url::parse(url)?;
        for _ in 0..=MAX_REDIRECTS {
            log::trace!("GET {current}");
            let mut response = client.get(current.clone()).send()?;
            let status = response.status();
            if status.is_client_error() || status.is_server_error() {
                return Err(TransportError::Status {
                    code: status.as_u16(),
                    message: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| TransportError::RedirectWithoutLocation {
                        url: current.to_string(),
                    })?;
                current = current.join(location)?;
                continue;
            }
            let mut file = fs::File::create(dest)?;
            io::copy(&mut response, &mut file)?;
            return Ok(());
        }
        Err(TransportError::TooManyRedirects {
            url: url.to_string(),
            hops: MAX_REDIRECTS,
        })
    }
}

#[cfg(test)]
mod test_download {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut text = format!("HTTP/1.1 {status}\r\n");
        for (name, value) in headers {
            text.push_str(&format!("{name}: {value}\r\n"));
        }
        text.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ));
        text
    }

    /// Answer one connection per response, in order. The handle yields the request lines seen.
    fn serve(responses: impl FnOnce(&str) -> Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let responses = responses(&base);
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let text = String::from_utf8_lossy(&request);
                seen.push(text.lines().next().unwrap_or_default().to_string());
                stream.write_all(reply.as_bytes()).unwrap();
            }
            seen
        });
        (base, handle)
    }

    #[test]
    fn follows_relative_and_absolute_redirects() {
        let (base, server) = serve(|base| {
            let absolute = format!("{base}/c");
            vec![
                response("301 Moved Permanently", &[("Location", "/b")], ""),
                response("302 Found", &[("Location", absolute.as_str())], ""),
                response("200 OK", &[], "archive bytes"),
            ]
        });
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tar.gz");
        HttpTransport
            .download(&format!("{base}/a"), &dest, None)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "archive bytes");
        assert_eq!(
            server.join().unwrap(),
            vec!["GET /a HTTP/1.1", "GET /b HTTP/1.1", "GET /c HTTP/1.1"]
        );
    }

    #[test]
    fn error_status_is_reported() {
        let (base, server) = serve(|_| vec![response("404 Not Found", &[], "nope")]);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tar.gz");
        let err = HttpTransport
            .download(&format!("{base}/missing"), &dest, None)
            .unwrap_err();
        assert!(
            matches!(&err, TransportError::Status { code: 404, message } if message == "Not Found"),
            "{err:?}"
        );
        assert!(!dest.exists());
        server.join().unwrap();
    }

    #[test]
    fn redirect_needs_a_location() {
        let (base, server) = serve(|_| vec![response("302 Found", &[], "")]);
        let dir = tempfile::tempdir().unwrap();
        let err = HttpTransport
            .download(&format!("{base}/nowhere"), &dir.path().join("out"), None)
            .unwrap_err();
        assert!(
            matches!(&err, TransportError::RedirectWithoutLocation { url } if url == &format!("{base}/nowhere")),
            "{err:?}"
        );
        server.join().unwrap();
    }

    #[test]
    fn redirect_loops_are_abandoned() {
        let (base, server) = serve(|_| {
            (0..=MAX_REDIRECTS)
                .map(|_| response("302 Found", &[("Location", "/loop")], ""))
                .collect()
        });
        let dir = tempfile::tempdir().unwrap();
        let url = format!("{base}/loop");
        let err = HttpTransport
            .download(&url, &dir.path().join("out"), None)
            .unwrap_err();
        assert!(
            matches!(&err, TransportError::TooManyRedirects { url: u, hops } if u == &url && *hops == MAX_REDIRECTS),
            "{err:?}"
        );
        assert_eq!(server.join().unwrap().len(), MAX_REDIRECTS + 1);
    }

    #[test]
    fn https_goes_through_the_proxy() {
        let (proxy, server) = serve(|_| vec![response("502 Bad Gateway", &[], "")]);
        let dir = tempfile::tempdir().unwrap();
        let result = HttpTransport.download(
            "https://example.invalid/user/name/archive/abc.tar.gz",
            &dir.path().join("out"),
            Some(&proxy),
        );
        assert!(result.is_err());
        assert_eq!(
            server.join().unwrap(),
            vec!["CONNECT example.invalid:443 HTTP/1.1"]
        );
    }
}
