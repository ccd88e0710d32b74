//! Request description passed to a [`Transport`](crate::transport::Transport).

use crate::error::{Error, Result};
use crate::form::{FormParams, HierarchicalForm};
use reqwest::Method;
use serde::Serialize;

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Flat form pairs, encoded by the HTTP client
    Form(Vec<(String, String)>),
    /// Form with literal bracket keys, encoded by [`HierarchicalForm::encode`]
    Hierarchical(HierarchicalForm),
    /// JSON document
    Json(serde_json::Value),
}

impl Body {
    /// Content type sent with this body.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Form(_) | Self::Hierarchical(_) => "application/x-www-form-urlencoded",
            Self::Json(_) => "application/json",
        }
    }
}

/// How the response body is stripped of its envelope before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Envelope {
    /// Probe the known wrapper keys
    #[default]
    Auto,
    /// Array whose elements are each wrapped under the given key
    Array(&'static str),
    /// Decode the body as is
    None,
}

/// A single API call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    body: Option<Body>,
    envelope: Envelope,
}

impl Request {
    /// Create a request without a body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            envelope: Envelope::Auto,
        }
    }

    /// `GET path`
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT path`
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE path`. A body may still be attached.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach flat form pairs.
    #[must_use]
    pub fn with_form(mut self, form: FormParams) -> Self {
        self.body = Some(Body::Form(form.into_pairs()));
        self
    }

    /// Attach a hierarchical form.
    #[must_use]
    pub fn with_hierarchical_form(mut self, form: HierarchicalForm) -> Self {
        self.body = Some(Body::Hierarchical(form));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if `payload` cannot be serialized.
    pub fn with_json<T>(mut self, payload: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload)
            .map_err(|err| Error::network("failed to encode request body", err))?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    /// Expect an array of objects wrapped under `key`.
    #[must_use]
    pub const fn unwrap_array(mut self, key: &'static str) -> Self {
        self.envelope = Envelope::Array(key);
        self
    }

    /// Decode the response without envelope handling.
    #[must_use]
    pub const fn raw(mut self) -> Self {
        self.envelope = Envelope::None;
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attached body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Envelope handling mode.
    #[must_use]
    pub const fn envelope(&self) -> Envelope {
        self.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Direction, RuleFields};
    use serde_json::json;

    #[test]
    fn delete_can_carry_a_form() {
        let request = Request::delete("vswitch/42")
            .with_form(FormParams::new().with("cancellation_date", "now"));
        assert_eq!(request.method(), &Method::DELETE);
        assert_eq!(
            request.body(),
            Some(&Body::Form(vec![(
                "cancellation_date".to_string(),
                "now".to_string()
            )]))
        );
        assert_eq!(
            request.body().unwrap().content_type(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn json_body_sets_json_content_type() {
        let request = Request::post("things")
            .with_json(&json!({"name": "a"}))
            .unwrap();
        assert_eq!(request.body().unwrap().content_type(), "application/json");
    }

    #[test]
    fn hierarchical_form_is_form_encoded() {
        let form = HierarchicalForm::new()
            .rule(Direction::Input, RuleFields::new().field("action", "accept"));
        let request = Request::post("firewall/1").with_hierarchical_form(form);
        assert_eq!(
            request.body().unwrap().content_type(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn envelope_modes() {
        assert_eq!(Request::get("server").envelope(), Envelope::Auto);
        assert_eq!(
            Request::get("key").unwrap_array("key").envelope(),
            Envelope::Array("key")
        );
        assert_eq!(Request::get("vswitch").raw().envelope(), Envelope::None);
    }
}
