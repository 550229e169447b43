//! WhatsApp campaign assembly for the analytics pipeline: phone
//! normalization, template payloads, and audience selection. The HTTP
//! transport is a collaborator behind [`MessageDispatcher`]; this crate never
//! performs network I/O.

pub mod campaign;
pub mod payload;
pub mod phone;
pub mod templates;

pub use campaign::{
    follow_up_campaign, reorder_campaign, run_campaign, win_back_campaign, CampaignPlan,
    CampaignReport, CampaignSkip, DispatchError, DispatchOutcome, MessageDispatcher,
    PlannedDispatch,
};
pub use payload::TemplateMessage;
pub use phone::{dispatchable_number, is_dispatchable, normalize};
pub use templates::{preview_body, Audience, Language, TemplateCatalog, TemplateRef};
