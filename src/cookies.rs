// SPDX-License-Identifier: MIT

//! Session cookie construction and removal.
//!
//! Removal cookies must carry the same attributes as the cookies they
//! replace, or browsers keep the stale pair around.

use crate::models::Session;
use axum_extra::extract::cookie::{Cookie, SameSite};

/// Access token cookie (the session marker).
pub const ACCESS_COOKIE: &str = "recipe_session";
/// Refresh token cookie.
pub const REFRESH_COOKIE: &str = "recipe_refresh";

/// Cookie lifetime. Outlives the access token on purpose: an expired access
/// token must still reach the gateway alongside its refresh token.
const COOKIE_MAX_AGE_DAYS: i64 = 30;

fn base_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie
}

/// Cookies carrying a session to the browser.
pub fn session_cookies(session: &Session, secure: bool) -> [Cookie<'static>; 2] {
    let mut access = base_cookie(ACCESS_COOKIE, session.access_token.clone(), secure);
    access.set_max_age(time::Duration::days(COOKIE_MAX_AGE_DAYS));

    let mut refresh = base_cookie(REFRESH_COOKIE, session.refresh_token.clone(), secure);
    refresh.set_max_age(time::Duration::days(COOKIE_MAX_AGE_DAYS));

    [access, refresh]
}

/// Cookies that delete the session pair.
pub fn removal_cookies(secure: bool) -> [Cookie<'static>; 2] {
    let mut access = base_cookie(ACCESS_COOKIE, String::new(), secure);
    access.set_max_age(time::Duration::ZERO);

    let mut refresh = base_cookie(REFRESH_COOKIE, String::new(), secure);
    refresh.set_max_age(time::Duration::ZERO);

    [access, refresh]
}
