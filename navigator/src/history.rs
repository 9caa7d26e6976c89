use anyhow::Result;
use reqwest::Url;

const PATH_PARAM: &str = "path";

/// The browser-history surface the navigation client writes to.
pub trait HistoryPort {
    /// `path` query parameter of the current location, if any.
    fn current_path(&self) -> Option<String>;

    /// Adds a location keyed by `path` and makes it current.
    fn push(&mut self, path: &str);
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    state: Option<String>,
    url: Url,
}

/// Session history held in memory, with back/forward like a browser tab.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl MemoryHistory {
    /// Starts with the page location. It carries no pushed state.
    pub fn new(initial: Url) -> Self {
        MemoryHistory {
            entries: vec![HistoryEntry {
                state: None,
                url: initial,
            }],
            index: 0,
        }
    }

    #[cfg(test)]
    pub fn parse(initial: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(initial)?))
    }

    pub fn current_url(&self) -> &Url {
        &self.entries[self.index].url
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Moves back one entry and returns its state, or `None` at the start.
    pub fn back(&mut self) -> Option<Option<String>> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.entries[self.index].state.clone())
    }

    pub fn forward(&mut self) -> Option<Option<String>> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index].state.clone())
    }
}

impl HistoryPort for MemoryHistory {
    fn current_path(&self) -> Option<String> {
        self.current_url()
            .query_pairs()
            .find(|(k, _)| k == PATH_PARAM)
            .map(|(_, v)| v.into_owned())
    }

    fn push(&mut self, path: &str) {
        let mut url = self.current_url().clone();
        url.query_pairs_mut().clear().append_pair(PATH_PARAM, path);

        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryEntry {
            state: Some(path.to_string()),
            url,
        });
        self.index += 1;
    }
}

/// Absolute URL of `page` next to `base`, carrying `?path=<encoded>`.
pub fn page_url(base: &Url, page: &str, path: &str) -> Result<Url> {
    let mut url = base.join(page)?;
    url.query_pairs_mut().clear().append_pair(PATH_PARAM, path);
    Ok(url)
}
