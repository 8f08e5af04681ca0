//! HTML sanitization over `ammonia`.
//!
//! The allowed set is written as a filter definition: comma-separated
//! elements, each optionally followed by its attributes in brackets, with
//! `*[...]` for attributes allowed on every element.
//!
//! ```text
//! p,br,b,i,a[href|title],*[class]
//! ```

use ammonia::Builder;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::SanitizerConfig;
use crate::error::{Result, SecurityError};

/// Elements whose content `ammonia` always drops; they cannot be allowed.
const CONTENT_STRIPPED: [&str; 2] = ["script", "style"];

/// Parsed allowed-tag filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDefinition {
    pub tags: BTreeSet<String>,
    pub tag_attributes: BTreeMap<String, BTreeSet<String>>,
    pub generic_attributes: BTreeSet<String>,
}

impl FilterDefinition {
    pub fn parse(filter: &str) -> Result<Self> {
        let mut definition = Self::default();

        for entry in split_entries(filter)? {
            let (element, attributes) = match entry.split_once('[') {
                Some((element, rest)) => {
                    let attributes = rest.strip_suffix(']').ok_or_else(|| {
                        invalid_filter(format!("unclosed attribute list in '{}'", entry))
                    })?;
                    (element.trim(), Some(attributes))
                }
                None => (entry, None),
            };

            let element = element.to_ascii_lowercase();
            if element != "*" {
                check_name(&element)?;
                if CONTENT_STRIPPED.contains(&element.as_str()) {
                    return Err(invalid_filter(format!("'{}' can never be allowed", element)));
                }
                definition.tags.insert(element.clone());
            }

            let Some(attributes) = attributes else { continue };
            let mut names = BTreeSet::new();
            for attribute in attributes.split('|').map(str::trim).filter(|a| !a.is_empty()) {
                let attribute = attribute.to_ascii_lowercase();
                check_name(&attribute)?;
                names.insert(attribute);
            }

            if element == "*" {
                definition.generic_attributes.extend(names);
            } else {
                definition.tag_attributes.entry(element).or_default().extend(names);
            }
        }

        Ok(definition)
    }

    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        self.generic_attributes.contains(attribute)
            || self
                .tag_attributes
                .get(tag)
                .is_some_and(|names| names.contains(attribute))
    }

    fn builder(&self) -> Builder<'_> {
        let mut builder = Builder::default();

        builder
            .tags(self.tags.iter().map(String::as_str).collect::<HashSet<_>>())
            .tag_attributes(
                self.tag_attributes
                    .iter()
                    .map(|(tag, names)| (tag.as_str(), names.iter().map(String::as_str).collect()))
                    .collect::<HashMap<_, HashSet<_>>>(),
            )
            .generic_attributes(self.generic_attributes.iter().map(String::as_str).collect::<HashSet<_>>());

        // ammonia owns `rel` on links unless the filter hands it to the author
        if self.allows_attribute("a", "rel") {
            builder.link_rel(None);
        }

        builder
    }
}

/// Cleans untrusted HTML down to an allowed set of elements and attributes.
///
/// An empty filter keeps ammonia's own conservative defaults.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    filter: String,
    definition: Option<FilterDefinition>,
}

impl Sanitizer {
    pub fn new(config: &SanitizerConfig) -> Result<Self> {
        let mut sanitizer = Self::default();
        sanitizer.set_filter_definition(&config.allowed)?;
        Ok(sanitizer)
    }

    pub fn filter_definition(&self) -> &str {
        &self.filter
    }

    /// Replaces the allowed set. The previous filter is kept if `filter` does
    /// not parse.
    pub fn set_filter_definition(&mut self, filter: &str) -> Result<()> {
        self.definition = if filter.trim().is_empty() {
            None
        } else {
            Some(FilterDefinition::parse(filter)?)
        };
        self.filter = filter.to_string();
        Ok(())
    }

    /// Restores ammonia's defaults.
    pub fn reset(&mut self) {
        self.filter.clear();
        self.definition = None;
    }

    pub fn sanitize(&self, html: &str) -> String {
        match &self.definition {
            Some(definition) => definition.builder().clean(html).to_string(),
            None => ammonia::clean(html),
        }
    }

    /// Cleans `html` with a one-off filter, leaving the configured one alone.
    pub fn sanitize_with(&self, html: &str, filter: &str) -> Result<String> {
        let definition = FilterDefinition::parse(filter)?;
        let cleaned = definition.builder().clean(html).to_string();
        Ok(cleaned)
    }
}

fn split_entries(filter: &str) -> Result<Vec<&str>> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in filter.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid_filter(format!("unbalanced ']' in '{}'", filter)))?;
            }
            ',' if depth == 0 => {
                entries.push(filter[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(filter[start..].trim());

    Ok(entries.into_iter().filter(|e| !e.is_empty()).collect())
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(invalid_filter(format!("'{}' is not an element or attribute name", name)));
    }
    Ok(())
}

fn invalid_filter(message: String) -> SecurityError {
    SecurityError::InvalidConfig(format!("HTML filter: {}", message))
}
