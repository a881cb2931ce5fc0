// Response builder contract used by the lifecycle steps

use crate::cache_control::CacheControl;
use crate::conditional::ETag;
use crate::error::{ERROR_CACHE_CONTROL, ERROR_MEDIA_TYPE};
use crate::link::LinkRelation;
use crate::{Error, HttpResponse};
use serde::Serialize;
use std::time::SystemTime;

/// The setter operations a lifecycle may perform on a response.
///
/// Implementors provide the four primitives; everything else is built on them.
pub trait ResponseBuilder {
    fn set_status(&mut self, status: u16) -> &mut Self;

    /// Replace every value of `name`.
    fn set_header(&mut self, name: &str, value: &str) -> &mut Self;

    /// Add another value of `name`, keeping existing ones.
    fn append_header(&mut self, name: &str, value: &str) -> &mut Self;

    /// Set the entity and its `Content-Type`; `None` clears both.
    fn set_body(&mut self, entity: Option<(&str, Vec<u8>)>) -> &mut Self;

    fn ok(&mut self) -> &mut Self {
        self.set_status(200)
    }

    fn created(&mut self, location: &str) -> &mut Self {
        self.set_status(201).set_header("Location", location)
    }

    fn no_content(&mut self) -> &mut Self {
        self.set_status(204).set_body(None)
    }

    /// 304 never carries an entity.
    fn not_modified(&mut self) -> &mut Self {
        self.set_status(304).set_body(None)
    }

    fn link(&mut self, link: &LinkRelation) -> &mut Self {
        self.append_header("Link", &link.to_header_value())
    }

    /// Set `Cache-Control`; an empty directive set emits nothing.
    fn cache_control(&mut self, cache_control: &CacheControl) -> &mut Self {
        let value = cache_control.to_header_value();
        if value.is_empty() {
            return self;
        }
        self.set_header("Cache-Control", &value)
    }

    fn etag(&mut self, etag: &ETag) -> &mut Self {
        self.set_header("ETag", &etag.to_header_value())
    }

    fn last_modified(&mut self, time: SystemTime) -> &mut Self {
        self.set_header("Last-Modified", &httpdate::fmt_http_date(time))
    }

    fn expires(&mut self, time: SystemTime) -> &mut Self {
        self.set_header("Expires", &httpdate::fmt_http_date(time))
    }

    fn set_json<T: Serialize + ?Sized>(
        &mut self,
        media_type: &str,
        value: &T,
    ) -> Result<&mut Self, Error> {
        let body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.set_body(Some((media_type, body))))
    }

    /// Render `err` as an `application/vnd.error+json` response.
    fn error(&mut self, err: &Error) -> &mut Self {
        let body = serde_json::to_vec(&err.body()).unwrap_or_default();
        self.set_status(err.status_code())
            .set_header("Cache-Control", ERROR_CACHE_CONTROL)
            .set_body(Some((ERROR_MEDIA_TYPE, body)))
    }
}

impl ResponseBuilder for HttpResponse {
    fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.insert_header(name, value);
        self
    }

    fn append_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.push_header(name, value);
        self
    }

    fn set_body(&mut self, entity: Option<(&str, Vec<u8>)>) -> &mut Self {
        match entity {
            Some((media_type, body)) => {
                self.insert_header("Content-Type", media_type);
                self.body = body;
            }
            None => {
                self.remove_header("Content-Type");
                self.body.clear();
            }
        }
        self
    }
}

impl HttpResponse {
    /// A fresh response rendering `err`.
    pub fn from_error(err: &Error) -> Self {
        let mut response = HttpResponse::new(500);
        response.error(err);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorBody, INTERNAL_ERROR_MESSAGE};

    #[test]
    fn test_links_are_separate_headers() {
        let mut res = HttpResponse::default();
        res.link(&LinkRelation::new("/a", "self"))
            .link(&LinkRelation::new("/b", "next").with_type("application/json"));
        assert_eq!(
            res.header_values("Link"),
            vec!["</a>;rel=\"self\"", "</b>;rel=\"next\";type=\"application/json\""]
        );
    }

    #[test]
    fn test_not_modified_clears_entity() {
        let mut res = HttpResponse::default();
        res.set_json("application/json", &serde_json::json!({"a": 1}))
            .unwrap();
        res.not_modified();
        assert_eq!(res.status, 304);
        assert!(res.body.is_empty());
        assert!(!res.has_header("Content-Type"));
    }

    #[test]
    fn test_empty_cache_control_not_emitted() {
        let mut res = HttpResponse::default();
        res.cache_control(&CacheControl::new());
        assert!(!res.has_header("Cache-Control"));
        res.cache_control(&CacheControl::cache_forever());
        assert_eq!(res.header("cache-control"), Some("max-age=31536000"));
    }

    #[test]
    fn test_validator_headers() {
        let mut res = HttpResponse::default();
        res.etag(&ETag::strong("abc"))
            .last_modified(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(784111777));
        assert_eq!(res.header("ETag"), Some("\"abc\""));
        assert_eq!(
            res.header("Last-Modified"),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn test_created_sets_location() {
        let mut res = HttpResponse::default();
        res.created("/users/9");
        assert_eq!(res.status, 201);
        assert_eq!(res.header("Location"), Some("/users/9"));
    }

    #[test]
    fn test_error_rendering() {
        let res = HttpResponse::from_error(&Error::Internal("db password wrong".into()));
        assert_eq!(res.status, 500);
        assert_eq!(res.header("Content-Type"), Some(ERROR_MEDIA_TYPE));
        assert_eq!(res.header("Cache-Control"), Some(ERROR_CACHE_CONTROL));
        let body: ErrorBody = res.json().unwrap();
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
    }
}
