//! Cross-page shell state: theme and mobile menu. Created once per session
//! with [`ShellState::init`] and kept until the session goes away.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Label of the button that switches away from this theme.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Theme::Light => "Dark Mode",
            Theme::Dark => "Light Mode",
        }
    }
}

pub struct ShellState {
    theme: watch::Sender<Theme>,
    menu_open: AtomicBool,
}

impl ShellState {
    pub fn init(theme: Theme) -> Self {
        let (tx, _rx) = watch::channel(theme);
        Self {
            theme: tx,
            menu_open: AtomicBool::new(false),
        }
    }

    pub fn theme(&self) -> Theme {
        *self.theme.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.theme.subscribe()
    }

    pub fn toggle_theme(&self) -> Theme {
        self.theme.send_modify(|t| *t = t.toggled());
        self.theme()
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open.load(Ordering::Relaxed)
    }

    pub fn toggle_menu(&self) -> bool {
        !self.menu_open.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn close_menu(&self) {
        self.menu_open.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_theme() {
        let shell = ShellState::init(Theme::Light);
        assert_eq!(shell.toggle_theme(), Theme::Dark);
        assert_eq!(shell.theme(), Theme::Dark);
        assert_eq!(shell.toggle_theme(), Theme::Light);
    }

    #[tokio::test]
    async fn subscribers_see_toggles() {
        let shell = ShellState::init(Theme::Dark);
        let mut rx = shell.subscribe();
        assert_eq!(*rx.borrow(), Theme::Dark);

        shell.toggle_theme();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Theme::Light);
    }

    #[test]
    fn menu_toggle_and_close() {
        let shell = ShellState::init(Theme::Light);
        assert!(!shell.menu_open());
        assert!(shell.toggle_menu());
        assert!(shell.menu_open());
        shell.close_menu();
        assert!(!shell.menu_open());
        assert!(shell.toggle_menu());
        assert!(!shell.toggle_menu());
    }
}
