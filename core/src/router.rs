//! Client-side route table and history-based navigation.
//!
//! Two views are registered at construction and never change. Every
//! successful navigation sets the document title before the target view is
//! handed back to the caller. Unknown paths are rejected without touching
//! the title or the history; what to show for them is the caller's decision.

use std::fmt;

use thiserror::Error;

pub const APP_NAME: &str = "ClinicCare EMR";
pub const FALLBACK_TITLE: &str = "ClinicCare";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    ConsultationsList,
    NewConsultation,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::ConsultationsList => f.write_str("ConsultationsList"),
            View::NewConsultation => f.write_str("NewConsultation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: &'static str,
    pub view: View,
    pub title: Option<&'static str>,
}

impl Route {
    /// `"<title> | ClinicCare EMR"`, or `"ClinicCare | ClinicCare EMR"` when
    /// the route has no title.
    pub fn page_title(&self) -> String {
        page_title(self.title)
    }
}

pub fn page_title(title: Option<&str>) -> String {
    format!("{} | {APP_NAME}", title.unwrap_or(FALLBACK_TITLE))
}

/// Where the page title goes. A browser host writes `document.title`;
/// headless hosts and tests use `RecordedTitle`.
pub trait DocumentTitle {
    fn set_title(&mut self, title: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedTitle {
    pub current: Option<String>,
    pub changes: usize,
}

impl DocumentTitle for RecordedTitle {
    fn set_title(&mut self, title: &str) {
        self.current = Some(title.to_string());
        self.changes += 1;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches path {0:?}")]
    NotFound(String),
    #[error("no route named {0:?}")]
    UnknownName(String),
    #[error("no history entry to move to")]
    HistoryBoundary,
}

/// Visited paths plus a cursor, like the browser session history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<&'static str>,
    cursor: usize,
}

impl History {
    pub fn current(&self) -> Option<&'static str> {
        self.entries.get(self.cursor).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    fn push(&mut self, path: &'static str) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(path);
        self.cursor = self.entries.len() - 1;
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    history: History,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: vec![
                Route {
                    path: "/",
                    name: "consultations",
                    view: View::ConsultationsList,
                    title: Some("Consultations"),
                },
                Route {
                    path: "/new",
                    name: "new-consultation",
                    view: View::NewConsultation,
                    title: Some("New Consultation"),
                },
            ],
            history: History::default(),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Exact path match; query string and fragment are ignored.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or(path);
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn resolve_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn current(&self) -> Option<&Route> {
        self.history.current().and_then(|path| self.resolve(path))
    }

    /// Navigate to `path`, setting the title before returning the view.
    pub fn push(&mut self, path: &str, document: &mut impl DocumentTitle) -> Result<View, RouteError> {
        let route = self
            .resolve(path)
            .ok_or_else(|| RouteError::NotFound(path.to_string()))?;
        let (target, view) = (route.path, route.view);
        document.set_title(&route.page_title());
        self.history.push(target);
        Ok(view)
    }

    pub fn push_name(&mut self, name: &str, document: &mut impl DocumentTitle) -> Result<View, RouteError> {
        let path = self
            .resolve_name(name)
            .map(|route| route.path)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        self.push(path, document)
    }

    pub fn back(&mut self, document: &mut impl DocumentTitle) -> Result<View, RouteError> {
        if !self.history.can_go_back() {
            return Err(RouteError::HistoryBoundary);
        }
        self.history.cursor -= 1;
        self.enter_current(document)
    }

    pub fn forward(&mut self, document: &mut impl DocumentTitle) -> Result<View, RouteError> {
        if !self.history.can_go_forward() {
            return Err(RouteError::HistoryBoundary);
        }
        self.history.cursor += 1;
        self.enter_current(document)
    }

    fn enter_current(&self, document: &mut impl DocumentTitle) -> Result<View, RouteError> {
        let route = self.current().ok_or(RouteError::HistoryBoundary)?;
        document.set_title(&route.page_title());
        Ok(route.view)
    }
}
