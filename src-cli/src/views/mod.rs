//! View layer: per-view ephemeral state on top of the document store.
//!
//! Views hold a store handle and their own selections. Nothing here is shared
//! across views or written back into the session.

pub mod chat;
pub mod compare;
pub mod dashboard;
pub mod summarize;

use std::fmt;
use std::str::FromStr;

pub use chat::ChatView;
pub use compare::CompareView;
pub use dashboard::DashboardStats;
pub use summarize::SummarizeView;

/// Navigation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    Home,
    #[default]
    Dashboard,
    Chat,
    Summarize,
    Compare,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Home,
        Route::Dashboard,
        Route::Chat,
        Route::Summarize,
        Route::Compare,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Dashboard => "/app",
            Route::Chat => "/app/chat",
            Route::Summarize => "/app/summarize",
            Route::Compare => "/app/compare",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "IntelliDoc-Lite",
            Route::Dashboard => "Dashboard",
            Route::Chat => "Smart Q&A",
            Route::Summarize => "Summarize",
            Route::Compare => "Compare Documents",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        Route::ALL
            .into_iter()
            .find(|r| r.path() == path)
            .ok_or_else(|| format!("Unknown route '{}'", s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths_roundtrip() {
        for route in Route::ALL {
            assert_eq!(route.path().parse::<Route>().unwrap(), route);
        }
    }

    #[test]
    fn test_route_trailing_slash_and_unknown() {
        assert_eq!("/app/chat/".parse::<Route>().unwrap(), Route::Chat);
        assert_eq!("/".parse::<Route>().unwrap(), Route::Home);
        assert!("/app/settings".parse::<Route>().is_err());
        assert!("app".parse::<Route>().is_err());
    }
}
