use anyhow::{Context, Result};
use fluent_bundle::{concurrent::FluentBundle, FluentResource};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::i18n::language::SupportedLanguage;

pub type Bundle = FluentBundle<FluentResource>;

/// Loads and manages Fluent translation resources
pub struct FluentLoader {
    bundles: HashMap<SupportedLanguage, Bundle>,
    locales_dir: PathBuf,
}

impl FluentLoader {
    pub fn new(locales_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundles: HashMap::new(),
            locales_dir: locales_dir.into(),
        }
    }

    /// Load all FTL files for a locale. Falls back to the messages compiled
    /// into the binary when the locale directory has none.
    pub fn load_locale(&mut self, language: SupportedLanguage) -> Result<()> {
        let mut bundle = FluentBundle::new_concurrent(vec![language.lang_id()]);
        // Messages end up in URLs and JSON, not in bidi-aware markup.
        bundle.set_use_isolating(false);

        let locale_dir = self.locales_dir.join(language.code());
        let mut sources = read_ftl_files(&locale_dir)?;
        if sources.is_empty() {
            tracing::debug!("No FTL files in {:?}, using embedded messages", locale_dir);
            sources.push((PathBuf::from("<embedded>"), embedded_messages(language).to_string()));
        }

        for (path, content) in sources {
            let resource = FluentResource::try_new(content).map_err(|(_, errors)| {
                anyhow::anyhow!("Failed to parse FTL file {:?}: {:?}", path, errors)
            })?;

            bundle.add_resource(resource).map_err(|errors| {
                anyhow::anyhow!("Failed to add resource {:?} to bundle: {:?}", path, errors)
            })?;
        }

        tracing::info!("Loaded messages for locale {}", language.code());

        self.bundles.insert(language, bundle);
        Ok(())
    }

    pub fn get_bundle(&self, language: &SupportedLanguage) -> Option<&Bundle> {
        self.bundles.get(language)
    }
}

fn read_ftl_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read locale directory: {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("ftl"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read file: {:?}", path))?;
            Ok((path, content))
        })
        .collect()
}

fn embedded_messages(language: SupportedLanguage) -> &'static str {
    match language {
        SupportedLanguage::English => include_str!("../../locales/en/common.ftl"),
        SupportedLanguage::Turkish => include_str!("../../locales/tr/common.ftl"),
    }
}
