//! Product categories and the category tree.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use common::CategoryId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::validation::ValidationErrors;

/// A category row. `parent_id` is `None` for roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Fields required to create a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Derived from `name` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
}

impl NewCategory {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_required_text("name", &self.name, 2, 100);
        if let Some(description) = &self.description {
            errors.check_length("description", description, 0, 1000);
        }
        if let Some(slug) = &self.slug
            && slugify(slug) != *slug
        {
            errors.add(
                "slug",
                "Slug can only contain lowercase letters, numbers and single hyphens",
            );
        }
        if self.slug.is_none() && slugify(&self.name).is_empty() {
            errors.add("slug", "A slug cannot be derived from this name");
        }
        errors.into_result()
    }

    /// Returns the explicit slug, or one derived from the name.
    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) => slug.clone(),
            None => slugify(&self.name),
        }
    }
}

/// Derives a URL slug: lowercase, only `[a-z0-9-]`, whitespace runs become
/// a single hyphen, no repeated or leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }

    slug
}

/// Parent links of every category, keyed by id.
///
/// The tree holds no category data, only `child -> parent` references, and
/// every walk is bounded by the number of known nodes so a corrupted chain
/// is reported instead of looping forever.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    parents: HashMap<CategoryId, Option<CategoryId>>,
}

impl CategoryTree {
    /// Builds the tree from `(id, parent_id)` pairs.
    pub fn from_links(links: impl IntoIterator<Item = (CategoryId, Option<CategoryId>)>) -> Self {
        Self {
            parents: links.into_iter().collect(),
        }
    }

    pub fn from_categories<'a>(categories: impl IntoIterator<Item = &'a Category>) -> Self {
        Self::from_links(categories.into_iter().map(|c| (c.id, c.parent_id)))
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.parents.contains_key(&id)
    }

    /// Returns the ancestors of `id`, nearest first.
    ///
    /// A parent that is not part of the tree ends the walk.
    pub fn ancestors(&self, id: CategoryId) -> Result<Vec<CategoryId>, DomainError> {
        let mut visited = HashSet::from([id]);
        let mut chain = Vec::new();
        let mut current = self.parents.get(&id).copied().flatten();

        while let Some(parent) = current {
            if !visited.insert(parent) || visited.len() > self.parents.len() + 1 {
                return Err(DomainError::CorruptCategoryTree { category_id: id });
            }
            chain.push(parent);
            current = self.parents.get(&parent).copied().flatten();
        }

        Ok(chain)
    }

    /// Depth of `id`: 0 for a root, parent level + 1 otherwise.
    pub fn level(&self, id: CategoryId) -> Result<usize, DomainError> {
        self.ancestors(id).map(|chain| chain.len())
    }

    /// Rejects a parent that would put `id` inside its own subtree.
    pub fn check_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> Result<(), DomainError> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };

        if parent_id == id || self.ancestors(parent_id)?.contains(&id) {
            return Err(DomainError::CategoryCycle {
                category_id: id,
                parent_id,
            });
        }

        Ok(())
    }
}
