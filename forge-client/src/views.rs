// Derived views over the record collections

use forge_utils::{ApplicationRecord, VersionRecord};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Newest first
    #[default]
    Date,
    /// Title (or name) ascending
    Name,
    /// Most viewed first
    Views,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "name" => Ok(SortBy::Name),
            "views" => Ok(SortBy::Views),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::Date => write!(f, "date"),
            SortBy::Name => write!(f, "name"),
            SortBy::Views => write!(f, "views"),
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Applications passing the state's filters.
///
/// Favorites-only is applied first. A search query then decides alone;
/// without one, a non-empty tag filter keeps apps carrying any selected tag.
pub fn filter_apps<'a>(apps: &'a [ApplicationRecord], state: &AppState) -> Vec<&'a ApplicationRecord> {
    let query = state.search_query.trim().to_lowercase();
    apps.iter()
        .filter(|app| !state.favorites_only || app.favorite)
        .filter(|app| {
            if !query.is_empty() {
                contains_ci(&app.app_name, &query)
                    || contains_ci(&app.app_title, &query)
                    || contains_ci(&app.prompt, &query)
            } else if !state.tag_filter.is_empty() {
                state.tag_filter.iter().any(|tag| app.has_tag(tag))
            } else {
                true
            }
        })
        .collect()
}

fn sort_label(app: &ApplicationRecord) -> String {
    if app.app_title.is_empty() {
        app.app_name.to_lowercase()
    } else {
        app.app_title.to_lowercase()
    }
}

pub fn sort_apps(apps: &mut [&ApplicationRecord], sort_by: SortBy) {
    match sort_by {
        SortBy::Date => apps.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortBy::Name => apps.sort_by_cached_key(|app| sort_label(app)),
        SortBy::Views => apps.sort_by(|a, b| b.views.cmp(&a.views)),
    }
}

/// Filtered and sorted, as the library list shows them
pub fn visible_apps<'a>(apps: &'a [ApplicationRecord], state: &AppState) -> Vec<&'a ApplicationRecord> {
    let mut visible = filter_apps(apps, state);
    sort_apps(&mut visible, state.sort_by);
    visible
}

/// Every tag in use, sorted
pub fn all_tags(apps: &[ApplicationRecord]) -> Vec<String> {
    apps.iter()
        .flat_map(|app| app.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analytics {
    pub total_apps: usize,
    /// Versions of the selected application, 0 without a selection
    pub total_versions: usize,
    pub favorites: usize,
    pub total_views: u64,
    pub models_used: usize,
    /// Mean code length in characters, rounded
    pub avg_code_size: usize,
}

pub fn analytics(
    apps: &[ApplicationRecord],
    versions: &[VersionRecord],
    selected: Option<&ApplicationRecord>,
) -> Analytics {
    let selected_id = selected.and_then(|app| app.id);
    let total_code: usize = apps.iter().map(|app| app.code.chars().count()).sum();
    let avg_code_size = if apps.is_empty() {
        0
    } else {
        (total_code as f64 / apps.len() as f64).round() as usize
    };

    Analytics {
        total_apps: apps.len(),
        total_versions: selected_id.map_or(0, |id| {
            versions.iter().filter(|v| v.app_id == id).count()
        }),
        favorites: apps.iter().filter(|app| app.favorite).count(),
        total_views: apps.iter().map(|app| app.views).sum(),
        models_used: apps
            .iter()
            .map(|app| app.model.as_str())
            .collect::<BTreeSet<_>>()
            .len(),
        avg_code_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn app(name: &str, title: &str, created_at: i64, views: u64, tags: &[&str]) -> ApplicationRecord {
        ApplicationRecord {
            id: Some(Uuid::new_v4()),
            prompt: format!("a {} app", name),
            code: "x".repeat(created_at as usize),
            subdomain: name.to_string(),
            hosted_url: format!("https://{}.puter.site", name),
            app_name: name.to_string(),
            app_uid: String::new(),
            app_title: title.to_string(),
            model: if views % 2 == 0 { "gpt-4o-mini" } else { "claude-3-5-sonnet" }.to_string(),
            dir: format!("app_{}", created_at),
            created_at,
            updated_at: None,
            views,
            favorite: false,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            version: 1,
            imported: false,
        }
    }

    fn library() -> Vec<ApplicationRecord> {
        let mut kanban = app("kanban", "Kanban Board", 30, 5, &["work"]);
        kanban.favorite = true;
        vec![
            app("clock", "", 10, 2, &["time"]),
            kanban,
            app("quiz", "Quiz Game", 20, 9, &["fun", "work"]),
        ]
    }

    fn names(apps: &[&ApplicationRecord]) -> Vec<String> {
        apps.iter().map(|a| a.app_name.clone()).collect()
    }

    #[test]
    fn test_sorting() {
        let apps = library();
        let mut view: Vec<&ApplicationRecord> = apps.iter().collect();

        sort_apps(&mut view, SortBy::Date);
        assert_eq!(names(&view), vec!["kanban", "quiz", "clock"]);

        sort_apps(&mut view, SortBy::Name);
        assert_eq!(names(&view), vec!["clock", "kanban", "quiz"]);

        sort_apps(&mut view, SortBy::Views);
        assert_eq!(names(&view), vec!["quiz", "kanban", "clock"]);
    }

    #[test]
    fn test_search_overrides_tag_filter() {
        let apps = library();
        let mut state = AppState::default();
        state.toggle_tag_filter("time");
        assert_eq!(names(&filter_apps(&apps, &state)), vec!["clock"]);

        state.search_query = "  QUIZ ".to_string();
        assert_eq!(names(&filter_apps(&apps, &state)), vec!["quiz"]);

        state.search_query = "board".to_string();
        assert_eq!(names(&filter_apps(&apps, &state)), vec!["kanban"]);
    }

    #[test]
    fn test_tag_filter_matches_any() {
        let apps = library();
        let mut state = AppState::default();
        state.toggle_tag_filter("work");
        state.toggle_tag_filter("time");
        state.sort_by = SortBy::Views;
        assert_eq!(names(&visible_apps(&apps, &state)), vec!["quiz", "kanban", "clock"]);
    }

    #[test]
    fn test_favorites_only_applies_before_search() {
        let apps = library();
        let mut state = AppState::default();
        state.favorites_only = true;
        state.search_query = "quiz".to_string();
        assert!(filter_apps(&apps, &state).is_empty());

        state.search_query.clear();
        assert_eq!(names(&filter_apps(&apps, &state)), vec!["kanban"]);
    }

    #[test]
    fn test_all_tags_sorted_unique() {
        assert_eq!(all_tags(&library()), vec!["fun", "time", "work"]);
    }

    #[test]
    fn test_analytics() {
        let apps = library();
        let selected = &apps[1];
        let version = |app_id| VersionRecord {
            id: None,
            app_id,
            code: String::new(),
            version: 1,
            created_at: 0,
            note: String::new(),
        };
        let versions = vec![
            version(selected.id.unwrap()),
            version(selected.id.unwrap()),
            version(apps[0].id.unwrap()),
        ];

        let stats = analytics(&apps, &versions, Some(selected));
        assert_eq!(
            stats,
            Analytics {
                total_apps: 3,
                total_versions: 2,
                favorites: 1,
                total_views: 16,
                models_used: 2,
                avg_code_size: 20,
            }
        );
        assert_eq!(analytics(&apps, &versions, None).total_versions, 0);
        assert_eq!(analytics(&[], &[], None), Analytics::default());
    }

    #[test]
    fn test_sort_by_parse() {
        assert_eq!("Views".parse::<SortBy>(), Ok(SortBy::Views));
        assert!("size".parse::<SortBy>().is_err());
        assert_eq!(SortBy::default().to_string(), "date");
    }
}
