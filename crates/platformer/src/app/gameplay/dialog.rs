use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Ok,
    Cancel,
}

/// A yes/no prompt waiting for the UI to show it and report the choice.
pub struct ConfirmDialog {
    headline: String,
    text: String,
    on_confirm: Box<dyn FnOnce()>,
}

impl ConfirmDialog {
    pub(crate) fn new(
        headline: impl Into<String>,
        text: impl Into<String>,
        on_confirm: Box<dyn FnOnce()>,
    ) -> Self {
        Self {
            headline: headline.into(),
            text: text.into(),
            on_confirm,
        }
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the dialog. Returns whether the confirm callback ran.
    pub(crate) fn resolve(self, choice: DialogChoice) -> bool {
        match choice {
            DialogChoice::Ok => {
                (self.on_confirm)();
                true
            }
            DialogChoice::Cancel => false,
        }
    }
}

impl fmt::Debug for ConfirmDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmDialog")
            .field("headline", &self.headline)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}
