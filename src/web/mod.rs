pub mod assignment;
pub mod index;
pub mod login;
pub mod logout;
pub mod management;
pub mod password_reset;
pub mod profile;
pub mod register;
pub mod results;
pub mod surveys;

use crate::error::FieldErrors;
use actix_web::http::header;
use actix_web::HttpResponse;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    index::configure(conf);
    assignment::configure(conf);
    login::configure(conf);
    logout::configure(conf);
    management::configure(conf);
    password_reset::configure(conf);
    profile::configure(conf);
    register::configure(conf);
    results::configure(conf);
    surveys::configure(conf);
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

/// Decodes an urlencoded body. Unlike `web::Form`, repeated keys are kept.
pub fn form_pairs(body: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// First value of a field.
pub fn form_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Every value of a repeated field, in order.
pub fn form_values<'a>(pairs: &'a [(String, String)], key: &'a str) -> impl Iterator<Item = &'a str> {
    pairs
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Every value of a repeated user id field. Blank values are skipped and
/// anything else that is not an id is reported against the field.
pub fn form_ids(pairs: &[(String, String)], key: &str, errors: &mut FieldErrors) -> Vec<i32> {
    let mut ids = Vec::new();
    for value in form_values(pairs, key) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match value.parse() {
            Ok(id) => ids.push(id),
            Err(_) => errors.add(key, format!("{:?} is not a valid user.", value)),
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_pairs_keeps_repeated_keys() {
        let pairs = form_pairs(b"title=Team+lunch&assignees=2&assignees=3&reviewers=&csrf_token=abc");
        assert_eq!(form_value(&pairs, "title"), Some("Team lunch"));
        assert_eq!(form_values(&pairs, "assignees").collect::<Vec<_>>(), vec!["2", "3"]);
        assert_eq!(form_value(&pairs, "missing"), None);
    }

    #[test]
    fn test_form_ids() {
        let pairs = form_pairs(b"assignees=2&assignees=&assignees=3&reviewers=bob");
        let mut errors = FieldErrors::new();

        assert_eq!(form_ids(&pairs, "assignees", &mut errors), vec![2, 3]);
        assert!(errors.is_empty());

        assert!(form_ids(&pairs, "reviewers", &mut errors).is_empty());
        assert!(errors.contains("reviewers"));
    }

    #[test]
    fn test_redirect() {
        let res = redirect("/profile/");
        assert_eq!(res.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/profile/")
        );
    }
}
