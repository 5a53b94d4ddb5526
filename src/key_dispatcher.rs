use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::calculator::Operator;

/// The closed symbol set every input path normalizes onto before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcKey {
    Digit(char),
    Op(Operator),
    Equals,
    Clear,
    Quit,
    ToggleHelp,
    ToggleDebug,
}

/// A physical key identity: code plus modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::empty(),
        }
    }

    pub fn with_ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }

    // Character keys already carry the shifted symbol ('+', '*'), so SHIFT is
    // noise for lookup purposes. Keypad-originated events arrive as the same
    // Char codes and need no separate table.
    fn normalized(mut self) -> Self {
        if matches!(self.code, KeyCode::Char(_)) {
            self.modifiers.remove(KeyModifiers::SHIFT);
        }
        self
    }
}

/// Maps key events onto [`CalcKey`] symbols. Unrecognized keys dispatch to
/// nothing and are swallowed by the app.
pub struct KeyDispatcher {
    map: HashMap<KeyBinding, CalcKey>,
}

impl KeyDispatcher {
    pub fn new() -> Self {
        let mut dispatcher = Self {
            map: HashMap::new(),
        };
        dispatcher.setup_default_bindings();
        dispatcher
    }

    pub fn dispatch(&self, event: &KeyEvent) -> Option<CalcKey> {
        let key = self
            .map
            .get(&KeyBinding::from_event(event).normalized())
            .copied();
        tracing::trace!(target: "input", "{:?} -> {:?}", event.code, key);
        key
    }

    fn setup_default_bindings(&mut self) {
        for c in '0'..='9' {
            self.bind(KeyBinding::new(KeyCode::Char(c)), CalcKey::Digit(c));
        }
        self.bind(KeyBinding::new(KeyCode::Char('.')), CalcKey::Digit('.'));

        for c in ['+', '-', '*', '/'] {
            if let Some(op) = Operator::from_char(c) {
                self.bind(KeyBinding::new(KeyCode::Char(c)), CalcKey::Op(op));
            }
        }

        // Enter and '=' resolve identically.
        self.bind(KeyBinding::new(KeyCode::Enter), CalcKey::Equals);
        self.bind(KeyBinding::new(KeyCode::Char('=')), CalcKey::Equals);

        self.bind(KeyBinding::new(KeyCode::Esc), CalcKey::Clear);
        self.bind(KeyBinding::new(KeyCode::Backspace), CalcKey::Clear);
        self.bind(KeyBinding::new(KeyCode::Delete), CalcKey::Clear);
        self.bind(KeyBinding::new(KeyCode::Char('c')), CalcKey::Clear);
        self.bind(KeyBinding::new(KeyCode::Char('C')), CalcKey::Clear);

        self.bind(KeyBinding::new(KeyCode::Char('q')), CalcKey::Quit);
        self.bind(KeyBinding::new(KeyCode::Char('Q')), CalcKey::Quit);
        self.bind(KeyBinding::with_ctrl(KeyCode::Char('c')), CalcKey::Quit);
        self.bind(KeyBinding::with_ctrl(KeyCode::Char('d')), CalcKey::Quit);

        self.bind(KeyBinding::new(KeyCode::F(1)), CalcKey::ToggleHelp);
        self.bind(KeyBinding::new(KeyCode::F(2)), CalcKey::ToggleDebug);
    }

    fn bind(&mut self, binding: KeyBinding, key: CalcKey) {
        self.map.insert(binding, key);
    }
}

impl Default for KeyDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
