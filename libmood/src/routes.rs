//! Navigation routes
//!
//! Two route trees exist. Unauthenticated sessions get the auth stack;
//! authenticated sessions get the tabbed app. Switching trees is driven
//! purely by the session's authenticated flag.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::Session;
use crate::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Route {
    Presentation,
    SignIn,
    SignUp,
    Home { should_load: bool },
    Post,
    Search,
    Profile,
    Config,
    UserScreen { id: UserId },
}

impl Route {
    /// Screen name, without parameters
    pub fn name(&self) -> &'static str {
        match self {
            Route::Presentation => "Presentation",
            Route::SignIn => "SignIn",
            Route::SignUp => "SignUp",
            Route::Home { .. } => "Home",
            Route::Post => "Post",
            Route::Search => "Search",
            Route::Profile => "Profile",
            Route::Config => "Config",
            Route::UserScreen { .. } => "UserScreen",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home { should_load: true } => write!(f, "Home (reload)"),
            Route::UserScreen { id } => write!(f, "UserScreen({})", id),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// A bottom tab of the app tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tab {
    pub name: &'static str,
    pub title: &'static str,
}

const AUTH_SCREENS: &[&str] = &["Presentation", "SignIn", "SignUp"];

const APP_TABS: &[Tab] = &[
    Tab { name: "Home", title: "Home" },
    Tab { name: "Search", title: "Search" },
    Tab { name: "Profile", title: "Profile" },
    Tab { name: "Config", title: "Settings" },
];

// Pushed on top of the tabs
const APP_STACK_SCREENS: &[&str] = &["Post", "UserScreen"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTree {
    Auth,
    App,
}

impl RouteTree {
    pub fn for_session(session: &Session) -> Self {
        if session.is_authenticated() {
            RouteTree::App
        } else {
            RouteTree::Auth
        }
    }

    pub fn initial_route(&self) -> Route {
        match self {
            RouteTree::Auth => Route::Presentation,
            RouteTree::App => Route::Home { should_load: false },
        }
    }

    /// Tabs shown at the bottom; the auth stack has none
    pub fn tabs(&self) -> &'static [Tab] {
        match self {
            RouteTree::Auth => &[],
            RouteTree::App => APP_TABS,
        }
    }

    /// Every screen name reachable in this tree
    pub fn screens(&self) -> Vec<&'static str> {
        match self {
            RouteTree::Auth => AUTH_SCREENS.to_vec(),
            RouteTree::App => APP_TABS
                .iter()
                .map(|tab| tab.name)
                .chain(APP_STACK_SCREENS.iter().copied())
                .collect(),
        }
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.screens().contains(&route.name())
    }
}
