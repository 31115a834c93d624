//! Resource key derivation
//!
//! A resource key names *what* is being authorized. It is a pure function of
//! the request category, originator, privileged flag and the category's
//! discriminating fields, laid out as
//!
//! ```text
//! {prefix}:{originator}:{privileged}:{field}:{field}...
//! ```
//!
//! Free-text components escape `%`, `:` and `,` as `%25`, `%3A` and `%2C`,
//! which keeps the encoding injective and lets external tooling split a key
//! back into its parts with [`ResourceKey::parse`]. A certificate field list
//! is preceded by its length so `[]` and `[""]` differ, and a raw counterparty
//! key is written as `key=...` so it can never read as `self` or `anyone`.

use crate::errors::{PermissionError, PermissionResult};
use crate::request::PermissionResource;
use std::borrow::Cow;
use std::fmt;
use warden_core::Counterparty;

/// Canonical identity of an authorization question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Derive the key for a resource requested by `originator`.
    pub fn derive(originator: &str, privileged: bool, resource: &PermissionResource) -> Self {
        let mut key = header(resource.key_prefix(), originator, privileged);
        match resource {
            PermissionResource::Protocol {
                protocol_id,
                counterparty,
                ..
            } => {
                push(&mut key, &protocol_id.security_level.to_string());
                push(&mut key, &escape(&protocol_id.name));
                push(&mut key, &counterparty_component(counterparty));
            }
            PermissionResource::Basket { basket, .. } => {
                push(&mut key, &escape(basket));
            }
            PermissionResource::Certificate {
                verifier,
                cert_type,
                fields,
            } => {
                push(&mut key, &escape(verifier));
                push(&mut key, &escape(cert_type));
                push(&mut key, &fields.len().to_string());
                let joined: Vec<Cow<'_, str>> = fields.iter().map(|f| escape(f)).collect();
                push(&mut key, &joined.join(","));
            }
            PermissionResource::Spending { satoshis, .. } => {
                push(&mut key, &satoshis.to_string());
            }
        }
        Self(key)
    }

    /// Coarser signature shared by every spending request of an originator.
    ///
    /// Spending allowances are cached under this key so one grant can cover
    /// several payments of different amounts.
    pub fn spending_allowance(originator: &str, privileged: bool) -> Self {
        Self(header("spend", originator, privileged))
    }

    /// Borrow the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Split a key into its components.
    pub fn parse(key: &str) -> PermissionResult<ParsedResourceKey> {
        let mut parts = key.split(':');
        let prefix = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PermissionError::malformed_key(key, "missing category prefix"))?;
        if !matches!(prefix, "proto" | "basket" | "cert" | "spend") {
            return Err(PermissionError::malformed_key(
                key,
                format!("unknown category prefix '{prefix}'"),
            ));
        }
        let originator = parts
            .next()
            .ok_or_else(|| PermissionError::malformed_key(key, "missing originator"))?;
        let privileged = match parts.next() {
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(PermissionError::malformed_key(
                    key,
                    format!("privileged flag must be true or false, got '{other}'"),
                ))
            }
            None => return Err(PermissionError::malformed_key(key, "missing privileged flag")),
        };
        let fields = parts
            .map(|segment| {
                segment
                    .split(',')
                    .map(|f| unescape(key, f))
                    .collect::<PermissionResult<Vec<_>>>()
                    .map(|v| v.join(","))
            })
            .collect::<PermissionResult<Vec<_>>>()?;
        Ok(ParsedResourceKey {
            prefix: prefix.to_string(),
            originator: unescape(key, originator)?,
            privileged,
            fields,
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Components recovered from a resource key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResourceKey {
    /// Category prefix (`proto`, `basket`, `cert`, `spend`)
    pub prefix: String,
    /// Originator domain
    pub originator: String,
    /// Privileged flag
    pub privileged: bool,
    /// Discriminating fields, unescaped; certificate field lists stay comma joined
    pub fields: Vec<String>,
}

fn header(prefix: &str, originator: &str, privileged: bool) -> String {
    format!("{prefix}:{}:{privileged}", escape(originator))
}

fn counterparty_component(counterparty: &Counterparty) -> Cow<'_, str> {
    match counterparty {
        Counterparty::Myself => Cow::Borrowed("self"),
        Counterparty::Anyone => Cow::Borrowed("anyone"),
        Counterparty::Key(key) => Cow::Owned(format!("key={}", escape(key))),
    }
}

fn push(key: &mut String, component: &str) {
    key.push(':');
    key.push_str(component);
}

fn escape(component: &str) -> Cow<'_, str> {
    if !component.contains(['%', ':', ',']) {
        return Cow::Borrowed(component);
    }
    let mut out = String::with_capacity(component.len() + 8);
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            ',' => out.push_str("%2C"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn unescape(key: &str, component: &str) -> PermissionResult<String> {
    let mut out = String::with_capacity(component.len());
    let mut rest = component;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let code = rest.get(idx + 1..idx + 3).unwrap_or_default();
        match code {
            "25" => out.push('%'),
            "3A" => out.push(':'),
            "2C" => out.push(','),
            _ => {
                return Err(PermissionError::malformed_key(
                    key,
                    format!("invalid escape '%{code}'"),
                ))
            }
        }
        rest = &rest[idx + 3..];
    }
    out.push_str(rest);
    Ok(out)
}
