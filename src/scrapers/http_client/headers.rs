//! Per-request header profiles.
//!
//! Every request gets a freshly randomized user agent plus the static accept
//! headers. The browser profile layers on the Referer and client-hint
//! headers that bot-challenge middleboxes expect from a real browser.

use super::user_agent::random_user_agent;

/// Header set sent with each request.
#[derive(Debug, Clone)]
pub enum HeaderProfile {
    /// Randomized user agent plus standard accept headers.
    Standard,
    /// Standard headers plus Referer and client hints.
    Browser { referer: String },
}

impl HeaderProfile {
    /// Build the header list for one request.
    pub fn request_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("User-Agent", random_user_agent().to_string()),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            ("Accept-Language", "en-US,en;q=0.5".to_string()),
            ("Connection", "keep-alive".to_string()),
            ("Upgrade-Insecure-Requests", "1".to_string()),
        ];

        if let HeaderProfile::Browser { referer } = self {
            headers.push(("Referer", referer.clone()));
            headers.push((
                "sec-ch-ua",
                r#""Chromium";v="122", "Not(A:Brand";v="24", "Google Chrome";v="122""#.to_string(),
            ));
            headers.push(("sec-ch-ua-mobile", "?0".to_string()));
            headers.push(("sec-ch-ua-platform", r#""Windows""#.to_string()));
            headers.push(("Sec-Fetch-Dest", "document".to_string()));
            headers.push(("Sec-Fetch-Mode", "navigate".to_string()));
            headers.push(("Sec-Fetch-Site", "same-origin".to_string()));
            headers.push(("Sec-Fetch-User", "?1".to_string()));
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_names(profile: &HeaderProfile) -> Vec<&'static str> {
        profile
            .request_headers()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    #[test]
    fn test_standard_profile_headers() {
        let names = header_names(&HeaderProfile::Standard);
        assert!(names.contains(&"User-Agent"));
        assert!(names.contains(&"Accept"));
        assert!(names.contains(&"Accept-Language"));
        assert!(!names.contains(&"Referer"));
        assert!(!names.contains(&"sec-ch-ua"));
    }

    #[test]
    fn test_browser_profile_adds_client_hints() {
        let profile = HeaderProfile::Browser {
            referer: "https://www.example.com".to_string(),
        };
        let headers = profile.request_headers();
        let referer = headers
            .iter()
            .find(|(name, _)| *name == "Referer")
            .map(|(_, value)| value.as_str());
        assert_eq!(referer, Some("https://www.example.com"));
        let names = header_names(&profile);
        assert!(names.contains(&"sec-ch-ua"));
        assert!(names.contains(&"Sec-Fetch-Mode"));
    }
}
