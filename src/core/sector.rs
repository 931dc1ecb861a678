//! Sector classification strategies.
//!
//! Two strategies exist side by side and must not be merged: the inline
//! keyword list used while scraping, and the mapping document used to
//! backfill stored records. A name can land in different sectors depending
//! on which one ran.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_SECTOR: &str = "Others";

/// Default mapping document written by `setup`.
pub const DEFAULT_SECTOR_MAPPING: &str = include_str!("../../docs/sector_mapping.json");

pub trait SectorClassifier: Send + Sync {
    /// Always returns a label; unknown names map to [`DEFAULT_SECTOR`].
    fn classify(&self, security: &str) -> String;

    fn name(&self) -> &str;
}

/// Ordered keyword sets. The first sector with a case-insensitive substring
/// hit wins, so generic tokens must stay ahead of the sectors they would
/// otherwise shadow.
const KEYWORD_SECTORS: &[(&str, &[&str])] = &[
    ("Banking", &["bank", "banking"]),
    (
        "IT & Software",
        &[
            "tcs",
            "infosys",
            "wipro",
            "tech",
            "software",
            "hcl",
            "mindtree",
            "persistent",
        ],
    ),
    (
        "Pharma & Healthcare",
        &[
            "pharma",
            "sun",
            "cipla",
            "reddy",
            "lupin",
            "biocon",
            "divi",
            "hospital",
            "healthcare",
        ],
    ),
    (
        "FMCG",
        &[
            "unilever",
            "hul",
            "itc",
            "britannia",
            "nestle",
            "dabur",
            "marico",
            "godrej consumer",
            "tata consumer",
            "colgate",
        ],
    ),
    (
        "Automobile",
        &[
            "maruti",
            "tata motors",
            "mahindra",
            "bajaj auto",
            "hero",
            "tvs motor",
            "eicher",
        ],
    ),
    (
        "Energy & Power",
        &[
            "reliance", "ongc", "oil", "bpcl", "hpcl", "ntpc", "power", "coal", "gail",
        ],
    ),
    (
        "Financial Services",
        &[
            "bajaj finance",
            "bajaj finserv",
            "finance",
            "insurance",
            "hdfc life",
            "sbi life",
        ],
    ),
    ("Telecom", &["airtel", "jio", "vodafone", "telecom"]),
    (
        "Infrastructure",
        &["l&t", "larsen", "toubro", "infrastructure", "gmr", "irb"],
    ),
    (
        "Metals & Mining",
        &[
            "tata steel",
            "jsw steel",
            "hindalco",
            "vedanta",
            "steel",
            "metal",
            "mining",
        ],
    ),
    ("Cement", &["ultratech", "cement", "ambuja", "acc"]),
];

/// Classifier used inline by the HTML sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl SectorClassifier for KeywordClassifier {
    fn classify(&self, security: &str) -> String {
        let lower = security.to_lowercase();
        KEYWORD_SECTORS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map_or(DEFAULT_SECTOR, |(sector, _)| sector)
            .to_string()
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MappingDocument {
    sector_mapping: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    fallback_rules: Vec<FallbackRuleDocument>,
}

#[derive(Debug, Deserialize)]
struct FallbackRuleDocument {
    pattern: String,
    sector: String,
}

#[derive(Debug)]
struct FallbackRule {
    pattern: Regex,
    sector: String,
}

/// Classifier driven by an externally maintained mapping document: company
/// names first, in document order, then regex fallback rules.
#[derive(Debug)]
pub struct MappingClassifier {
    companies: Vec<(String, Vec<String>)>,
    fallback_rules: Vec<FallbackRule>,
}

impl MappingClassifier {
    pub fn from_json(json: &str) -> Result<Self> {
        let document: MappingDocument =
            serde_json::from_str(json).context("Failed to parse sector mapping document")?;

        let mut companies = Vec::with_capacity(document.sector_mapping.len());
        for (sector, names) in document.sector_mapping {
            let names: Vec<String> = serde_json::from_value(names)
                .with_context(|| format!("Sector '{sector}' must map to a list of names"))?;
            let names = names.into_iter().map(|n| n.to_lowercase()).collect();
            companies.push((sector, names));
        }

        let fallback_rules = document
            .fallback_rules
            .into_iter()
            .map(|rule| {
                let pattern = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("Invalid fallback pattern: {}", rule.pattern))?;
                Ok(FallbackRule {
                    pattern,
                    sector: rule.sector,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            sectors = companies.len(),
            rules = fallback_rules.len(),
            "Loaded sector mapping"
        );
        Ok(Self {
            companies,
            fallback_rules,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sector mapping: {}", path.display()))?;
        Self::from_json(&json)
    }
}

impl SectorClassifier for MappingClassifier {
    fn classify(&self, security: &str) -> String {
        let lower = security.to_lowercase();
        if let Some((sector, _)) = self
            .companies
            .iter()
            .find(|(_, names)| names.iter().any(|n| lower.contains(n.as_str())))
        {
            return sector.clone();
        }
        self.fallback_rules
            .iter()
            .find(|rule| rule.pattern.is_match(security))
            .map_or_else(|| DEFAULT_SECTOR.to_string(), |rule| rule.sector.clone())
    }

    fn name(&self) -> &str {
        "mapping"
    }
}
