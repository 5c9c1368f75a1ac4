// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Organization metadata used to attribute databases to products.
//!
//! Two documents feed this: the org directory written by the importer
//! (`orgId -> orgName`) and the operator-maintained `orgName -> product` map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgDirectoryDocument {
    #[serde(default)]
    pub orgs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgProductDocument {
    #[serde(default, alias = "pcforgs")]
    pub org_products: BTreeMap<String, String>,
}

/// Outcome of resolving an org/space identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgResolution {
    Product { org: String, product: String },
    /// Org known (or taken verbatim) but no product is mapped to it.
    Unmapped { org: String },
    /// The tag value carried no identifier at all.
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgLookup {
    directory: BTreeMap<String, String>,
    products: BTreeMap<String, String>,
}

impl OrgLookup {
    pub fn new(directory: OrgDirectoryDocument, products: OrgProductDocument) -> Self {
        Self {
            directory: directory.orgs,
            products: products
                .org_products
                .into_iter()
                .map(|(org, product)| (org.to_lowercase(), product))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Resolve an `org.space` tag value.
    ///
    /// The first whitespace-separated token names the org. Directory ids are
    /// translated to org names; anything else is taken as the org name.
    pub fn resolve(&self, org_space: &str) -> OrgResolution {
        let Some(token) = org_space.split_whitespace().next() else {
            return OrgResolution::Empty;
        };

        let org = self
            .directory
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.to_string());

        match self.products.get(&org.to_lowercase()) {
            Some(product) => OrgResolution::Product {
                org,
                product: product.clone(),
            },
            None => OrgResolution::Unmapped { org },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> OrgLookup {
        OrgLookup::new(
            OrgDirectoryDocument {
                orgs: BTreeMap::from([("guid-1".to_string(), "Care-Org".to_string())]),
            },
            OrgProductDocument {
                org_products: BTreeMap::from([
                    ("Care-Org".to_string(), "Care".to_string()),
                    ("outcomes-org".to_string(), "Outcomes".to_string()),
                ]),
            },
        )
    }

    #[test]
    fn test_resolves_directory_id() {
        assert_eq!(
            lookup().resolve("guid-1 dev-space"),
            OrgResolution::Product {
                org: "Care-Org".to_string(),
                product: "Care".to_string()
            }
        );
    }

    #[test]
    fn test_resolves_org_name_directly() {
        assert!(matches!(
            lookup().resolve("Outcomes-Org prod"),
            OrgResolution::Product { product, .. } if product == "Outcomes"
        ));
    }

    #[test]
    fn test_unmapped_and_empty() {
        assert_eq!(
            lookup().resolve("billing"),
            OrgResolution::Unmapped {
                org: "billing".to_string()
            }
        );
        assert_eq!(lookup().resolve("   "), OrgResolution::Empty);
    }
}
