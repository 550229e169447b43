//! Audience and language to approved template identifiers, plus operator
//! previews of what each template says.

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

/// Which campaign a message belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    ReorderReminder,
    DeadCustomerWinBack,
    OneMonthFollowUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    Ar,
}

impl Language {
    /// Both languages go out for every dispatch.
    pub const ALL: [Language; 2] = [Language::En, Language::Ar];
}

/// An approved template reference: the name registered with the provider and
/// its language code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
    pub language_code: String,
}

/// Template identifiers per audience and language. Defaults mirror the
/// templates approved for the storefront's WhatsApp business account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub reorder_en: TemplateRef,
    pub reorder_ar: TemplateRef,
    pub win_back_en: TemplateRef,
    pub win_back_ar: TemplateRef,
    pub follow_up_en: TemplateRef,
    pub follow_up_ar: TemplateRef,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        let reorder_en =
            TemplateRef { name: "example_for_quick_reply".into(), language_code: "en_US".into() };
        let reorder_ar =
            TemplateRef { name: "order_management_1".into(), language_code: "ar".into() };
        Self {
            win_back_en: TemplateRef {
                name: "dead_customers_message".into(),
                language_code: "en".into(),
            },
            win_back_ar: TemplateRef {
                name: "dead_customer_message_ar".into(),
                language_code: "ar".into(),
            },
            // The follow-up reuses the reorder quick-reply templates.
            follow_up_en: reorder_en.clone(),
            follow_up_ar: reorder_ar.clone(),
            reorder_en,
            reorder_ar,
        }
    }
}

impl TemplateCatalog {
    pub fn resolve(&self, audience: Audience, language: Language) -> &TemplateRef {
        match (audience, language) {
            (Audience::ReorderReminder, Language::En) => &self.reorder_en,
            (Audience::ReorderReminder, Language::Ar) => &self.reorder_ar,
            (Audience::DeadCustomerWinBack, Language::En) => &self.win_back_en,
            (Audience::DeadCustomerWinBack, Language::Ar) => &self.win_back_ar,
            (Audience::OneMonthFollowUp, Language::En) => &self.follow_up_en,
            (Audience::OneMonthFollowUp, Language::Ar) => &self.follow_up_ar,
        }
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("template render failed: {0}")]
    Render(#[from] tera::Error),
}

const PREVIEW_EN_REORDER: &str =
    "Hi {{ customer_name }}! Based on your usual rhythm it might be time to restock. \
     Reply to reorder your favorites.";
const PREVIEW_EN_WIN_BACK: &str =
    "Hi {{ customer_name }}, we miss you! Here is a little something to welcome you back.";
const PREVIEW_EN_FOLLOW_UP: &str =
    "Hi {{ customer_name }}! It has been a month since your last order. How is everything?";
const PREVIEW_AR: &str = "مرحبا {{ customer_name }}";

/// Render a human-readable approximation of the template body for operator
/// review. The real copy lives with the provider; this is a preview only.
pub fn preview_body(
    audience: Audience,
    language: Language,
    customer_name: &str,
) -> Result<String, PreviewError> {
    let source = match (audience, language) {
        (_, Language::Ar) => PREVIEW_AR,
        (Audience::ReorderReminder, Language::En) => PREVIEW_EN_REORDER,
        (Audience::DeadCustomerWinBack, Language::En) => PREVIEW_EN_WIN_BACK,
        (Audience::OneMonthFollowUp, Language::En) => PREVIEW_EN_FOLLOW_UP,
    };

    let mut context = Context::new();
    context.insert("customer_name", customer_name);
    Ok(Tera::one_off(source, &context, true)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_resolves_every_audience_language_pair() {
        let catalog = TemplateCatalog::default();
        for audience in
            [Audience::ReorderReminder, Audience::DeadCustomerWinBack, Audience::OneMonthFollowUp]
        {
            for language in Language::ALL {
                let template = catalog.resolve(audience, language);
                assert!(!template.name.is_empty());
                assert!(!template.language_code.is_empty());
            }
        }
    }

    #[test]
    fn win_back_templates_differ_per_language() {
        let catalog = TemplateCatalog::default();
        assert_eq!(
            catalog.resolve(Audience::DeadCustomerWinBack, Language::En).name,
            "dead_customers_message"
        );
        assert_eq!(
            catalog.resolve(Audience::DeadCustomerWinBack, Language::Ar).name,
            "dead_customer_message_ar"
        );
    }

    #[test]
    fn preview_interpolates_the_customer_name() {
        let body =
            preview_body(Audience::DeadCustomerWinBack, Language::En, "Amal").expect("preview");
        assert!(body.contains("Amal"));
    }
}
