/// Keyboards attached to outgoing messages, independent of how the transport
/// encodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons attached under the message, one `Vec` per row.
    Inline(Vec<Vec<Button>>),
    /// Persistent menu shown in place of the user's keyboard.
    Menu(Vec<Vec<String>>),
    /// Hide a previously shown menu.
    RemoveMenu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Url(String),
    Callback(String),
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

impl Keyboard {
    /// All inline buttons in row order. Empty for non-inline keyboards.
    pub fn buttons(&self) -> Vec<&Button> {
        match self {
            Self::Inline(rows) => rows.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}
