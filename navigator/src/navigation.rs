//! Directory navigation: one state object, with the breadcrumb, the
//! rendered view and the history entry all derived from it.

use anyhow::Result;
use reqwest::Url;
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::history::{self, HistoryPort};
use crate::source::ListingSource;

pub const ROOT: &str = "/";
pub const FILE_VIEW_PAGE: &str = "fileview.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Rendered,
    Error,
}

/// One breadcrumb segment; clicking it lists `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub path: String,
}

/// `/a//b/` -> `/a/b`
pub fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

/// `Home` for the root, then one crumb per component with its prefix.
pub fn breadcrumb(path: &str) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        label: "Home".to_string(),
        path: ROOT.to_string(),
    }];

    let mut prefix = String::new();
    for part in path.split('/').filter(|s| !s.is_empty()) {
        prefix.push('/');
        prefix.push_str(part);
        crumbs.push(Crumb {
            label: part.to_string(),
            path: prefix.clone(),
        });
    }
    crumbs
}

/// A listing as shown: directories first, then files, server order kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    pub directories: Vec<Entry>,
    pub files: Vec<Entry>,
}

impl View {
    pub fn from_listing(entries: Vec<Entry>) -> Self {
        let (directories, files) = entries.into_iter().partition(Entry::is_dir);
        View { directories, files }
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.directories.iter().chain(self.files.iter())
    }

    pub fn item_count(&self) -> usize {
        self.directories.len() + self.files.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub current_path: String,
    pub breadcrumb: Vec<Crumb>,
}

impl NavigationState {
    fn at(path: &str) -> Self {
        NavigationState {
            current_path: path.to_string(),
            breadcrumb: breadcrumb(path),
        }
    }

    pub fn breadcrumb_paths(&self) -> Vec<&str> {
        self.breadcrumb.iter().map(|c| c.path.as_str()).collect()
    }
}

/// Identifies one listing request. Only the latest issued one may render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    path: String,
}

impl Ticket {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// What a click on an entry asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The directory was listed in place.
    Navigated,
    /// Show the file in a separate browsing context.
    OpenView(Url),
}

pub struct NavigationClient<S, H> {
    source: S,
    history: H,
    phase: Phase,
    state: NavigationState,
    view: View,
    issued: u64,
}

impl<S: ListingSource, H: HistoryPort> NavigationClient<S, H> {
    pub fn new(source: S, history: H) -> Self {
        NavigationClient {
            source,
            history,
            phase: Phase::Idle,
            state: NavigationState::at(ROOT),
            view: View::default(),
            issued: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    /// Initial load: the path in the page URL, or the root.
    pub fn start(&mut self) {
        let path = self.history.current_path().unwrap_or_else(|| ROOT.to_string());
        self.open(&path);
    }

    /// Lists `path` and renders it.
    pub fn open(&mut self, path: &str) {
        let ticket = self.begin(path);
        let result = self.source.fetch(ticket.path());
        self.complete(ticket, result);
    }

    /// Enters `Loading` for `path`; the ticket supersedes earlier ones.
    pub fn begin(&mut self, path: &str) -> Ticket {
        self.issued += 1;
        self.phase = Phase::Loading;
        Ticket {
            seq: self.issued,
            path: normalize(path),
        }
    }

    /// Applies a listing result. Returns false if the ticket was stale.
    pub fn complete(&mut self, ticket: Ticket, result: Result<Vec<Entry>>) -> bool {
        if ticket.seq != self.issued {
            debug!("discarding stale listing for {}", ticket.path);
            return false;
        }

        match result {
            Ok(entries) => {
                self.view = View::from_listing(entries);
                self.state = NavigationState::at(&ticket.path);
                self.phase = Phase::Rendered;

                if self.history.current_path().as_deref() != Some(ticket.path.as_str()) {
                    self.history.push(&ticket.path);
                }
            }
            Err(e) => {
                warn!("Error fetching files for {}: {:#}", ticket.path, e);
                self.phase = Phase::Error;
            }
        }
        true
    }

    /// Clicks breadcrumb segment `index`; out of range does nothing.
    pub fn click_crumb(&mut self, index: usize) -> bool {
        let Some(path) = self.state.breadcrumb_paths().get(index).map(|p| p.to_string()) else {
            return false;
        };
        self.open(&path);
        true
    }

    /// Directories are listed in place; files open a viewer next to `page`.
    pub fn click_entry(&mut self, entry: &Entry, page: &Url) -> Result<Action> {
        if entry.is_dir() {
            self.open(&entry.path);
            return Ok(Action::Navigated);
        }
        Ok(Action::OpenView(history::page_url(
            page,
            FILE_VIEW_PAGE,
            &entry.path,
        )?))
    }

    /// Back/forward arrived with the entry's stored state.
    pub fn on_pop_state(&mut self, state: Option<String>) {
        let path = state.unwrap_or_else(|| ROOT.to_string());
        self.open(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use crate::history::MemoryHistory;
    use anyhow::anyhow;
    use std::collections::HashMap;

    fn dir(path: &str) -> Entry {
        entry(path, EntryKind::Directory)
    }

    fn file(path: &str) -> Entry {
        entry(path, EntryKind::File)
    }

    fn entry(path: &str, kind: EntryKind) -> Entry {
        Entry {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            kind,
            item_count: 0,
            size: "0.00 MB".into(),
            modified_at: String::new(),
            error: None,
        }
    }

    #[derive(Default)]
    struct FakeSource {
        listings: HashMap<String, Vec<Entry>>,
    }

    impl FakeSource {
        fn tree() -> Self {
            let mut listings = HashMap::new();
            listings.insert("/".into(), vec![file("/readme.md"), dir("/a")]);
            listings.insert("/a".into(), vec![dir("/a/b"), file("/a/x.png")]);
            listings.insert("/a/b".into(), vec![]);
            FakeSource { listings }
        }
    }

    impl ListingSource for FakeSource {
        fn fetch(&self, path: &str) -> Result<Vec<Entry>> {
            self.listings
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow!("404 for {}", path))
        }
    }

    fn client() -> NavigationClient<FakeSource, MemoryHistory> {
        let history = MemoryHistory::parse("http://localhost:9001/").unwrap();
        NavigationClient::new(FakeSource::tree(), history)
    }

    fn labels(c: &NavigationClient<FakeSource, MemoryHistory>) -> Vec<&str> {
        c.state().breadcrumb.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn breadcrumb_has_prefix_paths() {
        let crumbs = breadcrumb("/a/b");
        let paths: Vec<&str> = crumbs.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/a", "/a/b"]);
        assert_eq!(breadcrumb("/").len(), 1);
        assert_eq!(normalize("a//b/"), "/a/b");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn start_renders_root_directories_first() {
        let mut c = client();
        assert_eq!(c.phase(), Phase::Idle);
        c.start();

        assert_eq!(c.phase(), Phase::Rendered);
        let names: Vec<&str> = c.view().entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "readme.md"]);
        assert_eq!(c.view().item_count(), 2);
        assert_eq!(labels(&c), vec!["Home"]);
    }

    #[test]
    fn start_uses_the_url_path() {
        let history = MemoryHistory::parse("http://localhost/?path=%2Fa").unwrap();
        let mut c = NavigationClient::new(FakeSource::tree(), history);
        c.start();

        assert_eq!(c.state().current_path, "/a");
        // Already in the URL: no duplicate entry.
        assert_eq!(c.history().entry_count(), 1);
    }

    #[test]
    fn clicking_down_builds_and_collapses_the_breadcrumb() {
        let page = Url::parse("http://localhost:9001/").unwrap();
        let mut c = client();
        c.start();

        let a = c.view().directories[0].clone();
        assert_eq!(c.click_entry(&a, &page).unwrap(), Action::Navigated);
        let b = c.view().directories[0].clone();
        c.click_entry(&b, &page).unwrap();

        assert_eq!(labels(&c), vec!["Home", "a", "b"]);
        assert_eq!(c.state().breadcrumb_paths(), vec!["/", "/a", "/a/b"]);

        assert!(c.click_crumb(1));
        assert_eq!(c.state().current_path, "/a");
        assert_eq!(labels(&c), vec!["Home", "a"]);
        assert!(!c.click_crumb(9));
    }

    #[test]
    fn back_returns_to_parent_without_pushing() {
        let mut c = client();
        c.start();
        c.open("/a");
        c.open("/a/b");
        assert_eq!(c.history().entry_count(), 4);

        let state = c.history_mut().back().unwrap();
        c.on_pop_state(state);

        assert_eq!(c.state().current_path, "/a");
        assert_eq!(c.history().entry_count(), 4);
        assert_eq!(c.history_mut().forward(), Some(Some("/a/b".to_string())));
    }

    #[test]
    fn pop_without_state_goes_home() {
        let mut c = client();
        c.start();
        c.open("/a");
        c.on_pop_state(None);
        assert_eq!(c.state().current_path, "/");
    }

    #[test]
    fn file_click_opens_viewer_and_keeps_state() {
        let page = Url::parse("http://localhost:9001/?path=%2Fa").unwrap();
        let mut c = client();
        c.open("/a");
        let before = c.history().entry_count();

        let png = c.view().files[0].clone();
        let action = c.click_entry(&png, &page).unwrap();
        assert_eq!(
            action,
            Action::OpenView(
                Url::parse("http://localhost:9001/fileview.html?path=%2Fa%2Fx.png").unwrap()
            )
        );
        assert_eq!(c.state().current_path, "/a");
        assert_eq!(c.phase(), Phase::Rendered);
        assert_eq!(c.history().entry_count(), before);
    }

    #[test]
    fn failed_fetch_keeps_previous_view() {
        let mut c = client();
        c.open("/a");
        c.open("/missing");

        assert_eq!(c.phase(), Phase::Error);
        assert_eq!(c.state().current_path, "/a");
        assert_eq!(c.view().item_count(), 2);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut c = client();
        let first = c.begin("/a");
        let second = c.begin("/a/b");

        assert!(c.complete(second, Ok(vec![])));
        assert!(!c.complete(first, Ok(vec![dir("/a/b")])));

        assert_eq!(c.state().current_path, "/a/b");
        assert_eq!(c.view().item_count(), 0);
    }
}
