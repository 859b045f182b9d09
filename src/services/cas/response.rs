//! Response bodies from the central authentication service.
//!
//! Validation answers come in two shapes, told apart by sniffing the body:
//! - two lines: `yes\n<username>\n` or `no\n\n`
//! - a tagged `serviceResponse` document with success/failure elements
//!
//! Proxy-ticket answers and single sign-out requests are always tagged.

use std::collections::BTreeMap;

use thiserror::Error;

use super::xml::{self, Element, XmlError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("response body is neither the two-line nor the tagged format")]
    Unrecognized,
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("tagged response is missing <{0}>")]
    MissingElement(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    TwoLine,
    Tagged,
}

impl ResponseFormat {
    pub fn sniff(body: &str) -> Option<Self> {
        let body = body.trim_start();
        if body.starts_with('<') {
            return Some(Self::Tagged);
        }
        match body.lines().next().map(str::trim) {
            Some("yes" | "no") => Some(Self::TwoLine),
            _ => None,
        }
    }
}

/// What the server asserted on success, before any consistency checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assertion {
    pub username: Option<String>,
    pub pgt_iou: Option<String>,
    /// Most recent proxy first.
    pub proxies: Vec<String>,
    pub attributes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResponse {
    Success(Assertion),
    Failure {
        code: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyResponse {
    Success { proxy_ticket: String },
    Failure {
        code: Option<String>,
        message: String,
    },
}

pub fn parse_validation(body: &str) -> Result<ValidationResponse, ResponseError> {
    match ResponseFormat::sniff(body) {
        Some(ResponseFormat::TwoLine) => parse_two_line(body),
        Some(ResponseFormat::Tagged) => parse_tagged(body),
        None => Err(ResponseError::Unrecognized),
    }
}

fn parse_two_line(body: &str) -> Result<ValidationResponse, ResponseError> {
    let mut lines = body.trim_start().lines();
    match lines.next().map(str::trim) {
        Some("yes") => Ok(ValidationResponse::Success(Assertion {
            username: lines.next().and_then(non_empty),
            ..Assertion::default()
        })),
        Some("no") => Ok(ValidationResponse::Failure {
            code: None,
            message: "ticket not recognized".to_string(),
        }),
        _ => Err(ResponseError::Unrecognized),
    }
}

fn parse_tagged(body: &str) -> Result<ValidationResponse, ResponseError> {
    let root = xml::parse(body)?;

    if let Some(success) = root.find("authenticationSuccess") {
        let proxies = success
            .child("proxies")
            .map(|p| {
                p.children_named("proxy")
                    .filter_map(|e| non_empty(&e.text))
                    .collect()
            })
            .unwrap_or_default();

        return Ok(ValidationResponse::Success(Assertion {
            username: success.child("user").and_then(|e| non_empty(&e.text)),
            pgt_iou: success
                .child("proxyGrantingTicket")
                .and_then(|e| non_empty(&e.text)),
            proxies,
            attributes: success
                .child("attributes")
                .map(collect_attributes)
                .unwrap_or_default(),
        }));
    }

    if let Some(failure) = root.find("authenticationFailure") {
        return Ok(failure_of(failure));
    }

    Err(ResponseError::MissingElement("authenticationSuccess"))
}

fn failure_of(element: &Element) -> ValidationResponse {
    ValidationResponse::Failure {
        code: element.attribute("code").map(str::to_string),
        message: element.trimmed_text().to_string(),
    }
}

// Two encodings are seen in the wild:
//   <cas:email>a@b</cas:email>
//   <cas:attribute name="email" value="a@b"/>
fn collect_attributes(attributes: &Element) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for child in &attributes.children {
        let (name, value) = match (child.attribute("name"), child.attribute("value")) {
            (Some(name), Some(value)) if child.name == "attribute" => {
                (name.to_string(), value.to_string())
            }
            _ => (child.name.clone(), child.trimmed_text().to_string()),
        };
        out.entry(name).or_default().push(value);
    }
    out
}

pub fn parse_proxy(body: &str) -> Result<ProxyResponse, ResponseError> {
    let root = xml::parse(body)?;

    if let Some(success) = root.find("proxySuccess") {
        let proxy_ticket = success
            .child("proxyTicket")
            .and_then(|e| non_empty(&e.text))
            .ok_or(ResponseError::MissingElement("proxyTicket"))?;
        return Ok(ProxyResponse::Success { proxy_ticket });
    }

    if let Some(failure) = root.find("proxyFailure") {
        return Ok(ProxyResponse::Failure {
            code: failure.attribute("code").map(str::to_string),
            message: failure.trimmed_text().to_string(),
        });
    }

    Err(ResponseError::MissingElement("proxySuccess"))
}

/// Service ticket named by a SAML single sign-out `logoutRequest`.
pub fn parse_logout_request(body: &str) -> Result<String, ResponseError> {
    let root = xml::parse(body)?;
    root.find("SessionIndex")
        .and_then(|e| non_empty(&e.text))
        .ok_or(ResponseError::MissingElement("SessionIndex"))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
