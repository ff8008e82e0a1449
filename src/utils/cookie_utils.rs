use actix_web::{cookie::Cookie, HttpRequest};
use std::collections::HashMap;

/// Cookie the Passage web component stores the auth token in
pub const AUTH_TOKEN_COOKIE: &str = "psg_auth_token";
/// Cookie the demo host keys its server-side session with
pub const SESSION_COOKIE: &str = "passage_session";

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: actix_web::cookie::SameSite,
    pub path: String,
    pub max_age: actix_web::cookie::time::Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: actix_web::cookie::SameSite::Lax,
            path: "/".to_string(),
            max_age: actix_web::cookie::time::Duration::minutes(30),
        }
    }
}

/// Build a cookie with the given options
#[must_use]
pub fn build_cookie(name: &str, value: String, options: &CookieOptions) -> Cookie<'static> {
    Cookie::build(name.to_owned(), value)
        .http_only(options.http_only)
        .secure(options.secure)
        .same_site(options.same_site)
        .path(options.path.clone())
        .max_age(options.max_age)
        .finish()
}

/// Create an expired cookie to clear a specific cookie
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(actix_web::cookie::SameSite::Lax)
        .path("/")
        .max_age(actix_web::cookie::time::Duration::seconds(-1))
        .finish()
}

/// Helper function to extract a cookie value from `HttpRequest`
#[must_use]
pub fn extract_cookie_value(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.cookie(cookie_name)
        .map(|cookie| cookie.value().to_string())
}

/// Collect every cookie on the request into a name -> value map
///
/// When a cookie name repeats, the first occurrence wins.
#[must_use]
pub fn collect_cookies(req: &HttpRequest) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    if let Ok(jar) = req.cookies() {
        for cookie in jar.iter() {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().to_string());
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_collect_cookies_keeps_first_value() {
        let req = TestRequest::get()
            .uri("/signin-passage")
            .insert_header(("Cookie", "psg_auth_token=first; other=1; psg_auth_token=second"))
            .to_http_request();

        let cookies = collect_cookies(&req);
        assert_eq!(cookies.get(AUTH_TOKEN_COOKIE).map(String::as_str), Some("first"));
        assert_eq!(cookies.get("other").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_expired_cookie_clears_value() {
        let cookie = create_expired_cookie(SESSION_COOKIE, false);
        assert_eq!(cookie.value(), "");
        assert_eq!(
            cookie.max_age(),
            Some(actix_web::cookie::time::Duration::seconds(-1))
        );
    }

    #[test]
    fn test_build_cookie_applies_options() {
        let options = CookieOptions {
            secure: false,
            ..CookieOptions::default()
        };
        let cookie = build_cookie(SESSION_COOKIE, "abc".to_string(), &options);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
