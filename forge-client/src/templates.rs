// Built-in prompt templates

use std::collections::BTreeSet;

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub prompt: &'static str,
    pub category: &'static str,
}

pub static TEMPLATES: [Template; 12] = [
    Template {
        id: "todo",
        name: "Todo App",
        icon: "✅",
        prompt: "A beautiful todo app with categories, priorities, due dates, dark/light mode toggle, and local storage persistence",
        category: "Productivity",
    },
    Template {
        id: "calculator",
        name: "Calculator",
        icon: "🔢",
        prompt: "A scientific calculator with history, memory functions, keyboard support, and a sleek modern UI",
        category: "Utilities",
    },
    Template {
        id: "notes",
        name: "Notes App",
        icon: "📝",
        prompt: "A notes app with markdown support, folders, search, tags, and auto-save functionality",
        category: "Productivity",
    },
    Template {
        id: "timer",
        name: "Pomodoro Timer",
        icon: "⏱️",
        prompt: "A pomodoro timer with customizable work/break intervals, statistics, sounds, and notifications",
        category: "Productivity",
    },
    Template {
        id: "weather",
        name: "Weather Dashboard",
        icon: "🌤️",
        prompt: "A weather dashboard that shows current conditions, 5-day forecast, with beautiful animations and location search",
        category: "Entertainment",
    },
    Template {
        id: "kanban",
        name: "Kanban Board",
        icon: "📋",
        prompt: "A kanban board with drag-and-drop cards, multiple columns, labels, and local storage",
        category: "Productivity",
    },
    Template {
        id: "password",
        name: "Password Generator",
        icon: "🔐",
        prompt: "A password generator with strength meter, customizable options, copy to clipboard, and password history",
        category: "Utilities",
    },
    Template {
        id: "quiz",
        name: "Quiz Game",
        icon: "🎯",
        prompt: "An interactive quiz game with multiple categories, scoring, timer, and leaderboard",
        category: "Entertainment",
    },
    Template {
        id: "expense",
        name: "Expense Tracker",
        icon: "💰",
        prompt: "An expense tracker with categories, charts, monthly budgets, and export functionality",
        category: "Productivity",
    },
    Template {
        id: "drawing",
        name: "Drawing App",
        icon: "🎨",
        prompt: "A drawing canvas with brush sizes, colors, shapes, layers, undo/redo, and save as image",
        category: "Entertainment",
    },
    Template {
        id: "music",
        name: "Music Player",
        icon: "🎵",
        prompt: "A music player UI with playlist, progress bar, volume control, shuffle, and visualizer",
        category: "Entertainment",
    },
    Template {
        id: "chat",
        name: "Chat Interface",
        icon: "💬",
        prompt: "A chat interface with message bubbles, typing indicators, timestamps, and emoji picker",
        category: "Communication",
    },
];

/// `"All"` followed by every template category, sorted
pub fn categories() -> Vec<&'static str> {
    let unique: BTreeSet<&'static str> = TEMPLATES.iter().map(|t| t.category).collect();
    std::iter::once(ALL_CATEGORIES).chain(unique).collect()
}

pub fn templates_in(category: &str) -> Vec<&'static Template> {
    TEMPLATES
        .iter()
        .filter(|t| category == ALL_CATEGORIES || t.category == category)
        .collect()
}

pub fn find_template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_start_with_all() {
        assert_eq!(
            categories(),
            vec!["All", "Communication", "Entertainment", "Productivity", "Utilities"]
        );
    }

    #[test]
    fn test_templates_in_category() {
        assert_eq!(templates_in("All").len(), 12);
        assert_eq!(templates_in("Productivity").len(), 5);
        assert_eq!(templates_in("Communication")[0].id, "chat");
        assert!(templates_in("Nope").is_empty());
    }

    #[test]
    fn test_template_ids_are_unique() {
        let ids: BTreeSet<&str> = TEMPLATES.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), TEMPLATES.len());
        assert_eq!(find_template("kanban").map(|t| t.name), Some("Kanban Board"));
    }
}
