//! Message catalog with `{{Name}}` placeholder templates.
//!
//! Every user-visible string has a built-in default; a JSON file (flat
//! id → template map) can override any of them, which is how the shipped
//! Russian translation is loaded.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use log::warn;

const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    (
        "please_select_passport_validity_period",
        "Please select the passport validity period.",
    ),
    ("five_years", "Five years"),
    ("ten_years", "Ten years"),
    (
        "please_provide_application_number",
        "Please provide application number",
    ),
    (
        "your_application_is_being_checked",
        "Your application with the number {{ApplicationNumber}} is checked every 30 minutes:\n\n{{Status}}",
    ),
    (
        "your_application_was_deleted",
        "Your application (#{{ApplicationNumber}}) has been deleted and will no longer be tracked.",
    ),
    ("no_active_application", "You don't have an active application."),
    ("unknown_command", "Unknown command"),
    (
        "error_getting_status",
        "An error occurred while retrieving the status. Please try again later.",
    ),
    (
        "no_saved_application",
        "The application with that number has not been saved on the website. \nPerhaps you entered an incorrect number. Please try again.",
    ),
    ("your_document_is_ready", "Your document is already ready."),
    (
        "application_saved",
        "Your application number has been saved, we will check the status every half an hour, if the status does not change within a day, we will send you the current status. \n\nAs soon as the application status changes, we will send you a notification, your current status is \"{{Status}}\"\n\nPlease do not turn off notifications so you can immediately find out the readiness of your document.",
    ),
    (
        "please_specify_the_city_where_you_submitted_the_application",
        "Your application number has been saved. Please specify the city where you submitted the application.",
    ),
    (
        "the_city_was_not_found",
        "The city was not found. Please double-check if you spelled it correctly or if it may be known by a different name.",
    ),
    (
        "application_status_changed",
        "The status of your application has been updated to: {{Status}}",
    ),
    (
        "application_status_not_changed",
        "The status of your application has not changed in the last 24 hours:\n\n{{Status}}",
    ),
];

#[derive(Clone)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// Catalog with the built-in defaults only.
    pub fn builtin() -> Self {
        let messages = DEFAULT_MESSAGES
            .iter()
            .map(|(id, template)| (id.to_string(), template.to_string()))
            .collect();
        Self { messages }
    }

    /// Built-in defaults overridden by the translations in `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read message catalog {}", path.display()))?;
        let overrides: HashMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse message catalog {}", path.display()))?;

        let mut catalog = Self::builtin();
        for (id, template) in overrides {
            if !catalog.messages.contains_key(&id) {
                warn!("message catalog defines unknown id '{id}'");
            }
            catalog.messages.insert(id, template);
        }
        Ok(catalog)
    }

    /// Render a message, substituting `{{Name}}` placeholders.
    /// Unknown ids fall back to the id itself so a missing translation is
    /// visible instead of silent.
    pub fn render(&self, id: &str, args: &[(&str, &str)]) -> String {
        let template = match self.messages.get(id) {
            Some(template) => template.clone(),
            None => {
                warn!("no template for message id '{id}'");
                id.to_string()
            }
        };

        let mut rendered = template;
        for (name, value) in args {
            rendered = rendered.replace(&format!("{{{{{name}}}}}"), value);
        }
        rendered
    }

    pub fn text(&self, id: &str) -> String {
        self.render(id, &[])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::io::Write;

    use super::MessageCatalog;

    #[test]
    fn renders_placeholders() {
        let catalog = MessageCatalog::builtin();
        let rendered = catalog.render(
            "application_status_changed",
            &[("Status", "В обработке")],
        );
        assert_eq!(
            rendered,
            "The status of your application has been updated to: В обработке"
        );
    }

    #[test]
    fn unknown_id_falls_back_to_id() {
        let catalog = MessageCatalog::builtin();
        assert_eq!(catalog.text("does_not_exist"), "does_not_exist");
    }

    #[test]
    fn file_overrides_builtin() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "{}",
            r#"{"unknown_command": "Неизвестная команда"}"#
        )
        .unwrap();

        let catalog = MessageCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.text("unknown_command"), "Неизвестная команда");
        // Ids absent from the file keep their defaults.
        assert_eq!(catalog.text("five_years"), "Five years");
    }
}
