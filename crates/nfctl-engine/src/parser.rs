//! Vendor output line-template parsing.
//!
//! The show command's reply is vendor text. A parser turns it into
//! structured records; the engine only ever looks fields up by name, so
//! the matching engine behind the trait can be swapped per vendor.

use std::collections::HashMap;

use regex::Regex;

use nfctl_core::{Error, LineTemplateConfig, Result};

/// One parsed output line: field name -> captured value.
pub type Record = HashMap<String, String>;

/// Swappable collaborator turning raw reply text into records.
pub trait OutputParser {
    /// Parse raw reply text into zero or more records.
    fn parse(&self, raw: &str) -> Result<Vec<Record>>;
}

/// Parser built from named-capture line templates.
///
/// Each non-empty line is tried against the templates in order; the first
/// match wins and its named captures become the record's fields. Lines no
/// template matches are skipped, not errors - vendor output is full of
/// headers and separators.
pub struct TemplateParser {
    templates: Vec<(String, Regex)>,
}

impl TemplateParser {
    /// Compile templates from configuration.
    pub fn new(configs: &[LineTemplateConfig]) -> Result<Self> {
        let mut templates = Vec::with_capacity(configs.len());
        for config in configs {
            let regex = Regex::new(&config.pattern)
                .map_err(|e| Error::Parse(format!("template '{}': {e}", config.name)))?;
            templates.push((config.name.clone(), regex));
        }
        Ok(Self { templates })
    }

    /// Number of compiled templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are configured.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl OutputParser for TemplateParser {
    fn parse(&self, raw: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for line in raw.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            for (name, regex) in &self.templates {
                if let Some(caps) = regex.captures(line) {
                    let mut record = Record::new();
                    record.insert("template".to_string(), name.clone());
                    for cap_name in regex.capture_names().flatten() {
                        if let Some(m) = caps.name(cap_name) {
                            record.insert(cap_name.to_string(), m.as_str().to_string());
                        }
                    }
                    records.push(record);
                    break;
                }
            }
        }
        Ok(records)
    }
}
