use serde::{Deserialize, Serialize};

/// Maximum number of footer buttons an owner may configure.
pub const MAX_FOOTER_BUTTONS: usize = 3;

/// Maximum footer button label length, in bytes.
pub const MAX_FOOTER_TEXT_BYTES: usize = 50;

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    #[serde(rename = "url")]
    Url(String),
    #[serde(rename = "callback_data")]
    Callback(String),
}

/// A single inline button, persisted as `{text, url}` or
/// `{text, callback_data}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    #[serde(flatten)]
    pub action: ButtonAction,
}

impl Button {
    #[must_use]
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    #[must_use]
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

/// Rows of inline buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonLayout {
    pub inline_keyboard: Vec<Vec<Button>>,
}

impl ButtonLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A layout holding exactly one button.
    #[must_use]
    pub fn single(button: Button) -> Self {
        Self {
            inline_keyboard: vec![vec![button]],
        }
    }

    /// Append a row of buttons.
    #[must_use]
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.inline_keyboard.push(buttons);
        }
        self
    }

    pub fn push_row(&mut self, buttons: Vec<Button>) {
        if !buttons.is_empty() {
            self.inline_keyboard.push(buttons);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inline_keyboard.iter().all(Vec::is_empty)
    }

    /// Iterate every button across all rows.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.inline_keyboard.iter().flatten()
    }
}

/// An owner-configured link button appended below posted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterButton {
    pub text: String,
    pub url: String,
}

impl From<FooterButton> for Button {
    fn from(b: FooterButton) -> Self {
        Self::url(b.text, b.url)
    }
}
