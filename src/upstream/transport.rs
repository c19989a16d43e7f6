//! Transport selection by URL scheme.

use url::Url;

/// Which outbound client a URL is fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Plain HTTP.
    Plain,
    /// HTTPS only; the client refuses anything else.
    Tls,
}

impl Transport {
    /// Pick the transport for `url`, or `None` for unsupported schemes.
    pub fn for_url(url: &Url) -> Option<Self> {
        match url.scheme() {
            "http" => Some(Transport::Plain),
            "https" => Some(Transport::Tls),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Plain => "plain",
            Transport::Tls => "tls",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_scheme() {
        let url = |s: &str| Url::parse(s).unwrap();
        assert_eq!(Transport::for_url(&url("http://a.example/x")), Some(Transport::Plain));
        assert_eq!(Transport::for_url(&url("HTTPS://a.example/x")), Some(Transport::Tls));
        assert_eq!(Transport::for_url(&url("ftp://a.example/x")), None);
        assert_eq!(Transport::for_url(&url("file:///etc/passwd")), None);
    }
}
