//! Component trait: the interface every UI panel implements.
//!
//! - Components own their selection state and render themselves.
//! - Components receive `AppState` (read-only) for catalogs and task progress.
//! - Components produce `Vec<Action>`; they never start work themselves.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key event while focused. Returns actions to be dispatched.
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action>;

    /// Called when the catalog this component shows has changed.
    fn sync(&mut self, state: &AppState);

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState);
}
