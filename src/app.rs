use crate::session::{Controller, Session};
use crate::settings::{ServerDetails, Settings, SettingsField};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Main,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    StartTest,
}

pub struct App {
    pub controller: Controller,
    pub should_quit: bool,

    // UI state
    pub view: AppView,
    pub show_details: bool,
    pub details: ServerDetails,

    // Settings
    pub settings: Settings,
    pub selected_setting: SettingsField,
}

impl App {
    pub fn new(controller: Controller, settings: Settings) -> Self {
        Self {
            controller,
            should_quit: false,
            view: AppView::Main,
            show_details: false,
            details: settings.details.clone(),
            settings,
            selected_setting: SettingsField::TickInterval,
        }
    }

    pub fn session(&self) -> &Session {
        self.controller.session()
    }

    pub fn handle_key_event(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match self.view {
            AppView::Main => self.handle_main_key(key),
            AppView::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_main_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(AppAction::Quit)
            }
            KeyCode::Enter | KeyCode::Char('r') => {
                // The start control is disabled while a run is in progress.
                if self.session().is_running() {
                    None
                } else {
                    Some(AppAction::StartTest)
                }
            }
            KeyCode::Char('d') => {
                self.show_details = !self.show_details;
                None
            }
            KeyCode::Char('s') => {
                if !self.session().is_running() {
                    self.view = AppView::Settings;
                }
                None
            }
            _ => None,
        }
    }

    fn handle_settings_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                self.leave_settings();
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_setting = self.selected_setting.prev();
                None
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.selected_setting = self.selected_setting.next();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.settings.adjust(self.selected_setting, false);
                None
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
                self.settings.adjust(self.selected_setting, true);
                None
            }
            _ => None,
        }
    }

    fn leave_settings(&mut self) {
        self.controller.configure(self.settings.controller_config());
        self.view = AppView::Main;
    }

    pub fn perform(&mut self, action: AppAction) {
        match action {
            AppAction::Quit => {
                self.should_quit = true;
                self.controller.teardown();
            }
            AppAction::StartTest => {
                self.show_details = false;
                self.controller.start();
            }
        }
    }

    /// Pulls pending run events into the session. Called once per frame.
    pub fn tick(&mut self) {
        self.controller.pump();
    }
}

pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
