//! WhatsApp Cloud API template-message payloads. Serialization only; the
//! HTTP transport is the caller's collaborator.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TemplateMessage {
    pub messaging_product: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub template: Template,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: String,
    pub language: TemplateLanguage,
    pub components: Vec<Component>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TemplateLanguage {
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Body { parameters: Vec<Parameter> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parameter {
    Text { text: String },
}

impl TemplateMessage {
    /// A template message with one body component of text parameters.
    pub fn new(
        to: impl Into<String>,
        template_name: impl Into<String>,
        language_code: impl Into<String>,
        body_params: Vec<String>,
    ) -> Self {
        Self {
            messaging_product: "whatsapp",
            to: to.into(),
            message_type: "template",
            template: Template {
                name: template_name.into(),
                language: TemplateLanguage { code: language_code.into() },
                components: vec![Component::Body {
                    parameters: body_params
                        .into_iter()
                        .map(|text| Parameter::Text { text })
                        .collect(),
                }],
            },
        }
    }
}
