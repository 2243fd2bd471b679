use std::collections::HashMap;
use crate::models::Module;

/// Maps a module's slug to the family name its runtime parameters are filed under.
///
/// Loaded from the `[families]` configuration table so new modules need no
/// code change; a slug without an entry is its own family.
#[derive(Debug, Clone, Default)]
pub struct FamilyTable {
    aliases: HashMap<String, String>,
}

impl FamilyTable {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    pub fn resolve_slug(&self, slug: &str) -> String {
        self.aliases
            .get(slug)
            .cloned()
            .unwrap_or_else(|| slug.to_string())
    }

    pub fn resolve(&self, module: &Module) -> String {
        self.resolve_slug(module.slug())
    }
}
