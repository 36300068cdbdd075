use serde::Serialize;

const LISTING_HEADER: &str = "Available models:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderModels {
    pub name: String,
    pub models: Vec<String>,
}

/// Providers in the order the engine listed them. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProviderCatalog {
    providers: Vec<ProviderModels>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, P, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<M>)>,
        P: Into<String>,
        M: Into<String>,
    {
        let mut catalog = Self::new();
        for (name, models) in pairs {
            let entry = catalog.begin_provider(name.into());
            entry.extend(models.into_iter().map(Into::into));
        }
        catalog
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.providers.iter().any(|entry| entry.name == provider)
    }

    /// Models for `provider`; an empty slice means none are available.
    pub fn models(&self, provider: &str) -> Option<&[String]> {
        self.providers
            .iter()
            .find(|entry| entry.name == provider)
            .map(|entry| entry.models.as_slice())
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|entry| entry.name.as_str())
    }

    pub fn first(&self) -> Option<&ProviderModels> {
        self.providers.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderModels> {
        self.providers.iter()
    }

    /// Starts (or restarts) a provider section and returns its model list.
    /// A repeated name keeps its first position but loses earlier models.
    fn begin_provider(&mut self, name: String) -> &mut Vec<String> {
        let index = match self.providers.iter().position(|entry| entry.name == name) {
            Some(index) => {
                self.providers[index].models.clear();
                index
            }
            None => {
                self.providers.push(ProviderModels {
                    name,
                    models: Vec::new(),
                });
                self.providers.len() - 1
            }
        };
        &mut self.providers[index].models
    }

    fn begin_existing(&mut self, name: &str) -> &mut Vec<String> {
        match self.providers.iter().position(|entry| entry.name == name) {
            Some(index) => &mut self.providers[index].models,
            None => self.begin_provider(name.to_string()),
        }
    }
}

/// Parses `<engine> --listmodels` output.
///
/// Unindented lines that do not start with `[` open a provider section;
/// indented or `[`-prefixed lines are models of the current section with
/// any `[n]` index prefix removed. Models before the first provider are
/// dropped.
pub fn parse_listing(output: &str) -> ProviderCatalog {
    let mut catalog = ProviderCatalog::new();
    let mut current: Option<String> = None;

    for raw in output.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == LISTING_HEADER {
            continue;
        }

        let indented = raw.starts_with(char::is_whitespace);
        if !indented && !trimmed.starts_with('[') {
            catalog.begin_provider(trimmed.to_string());
            current = Some(trimmed.to_string());
            continue;
        }

        let Some(provider) = current.as_deref() else {
            continue;
        };
        let model = strip_index_prefix(trimmed);
        if model.is_empty() {
            continue;
        }
        catalog.begin_existing(provider).push(model.to_string());
    }

    catalog
}

fn strip_index_prefix(line: &str) -> &str {
    if line.contains('[') {
        if let Some((_, rest)) = line.split_once(']') {
            return rest.trim();
        }
    }
    line
}
