//! Line-oriented session commands for `uast-dev session`.
//!
//! Each stdin line is one JSON object tagged by `op`, e.g.
//! `{"op":"set_code","value":"package main"}` or `{"op":"edit_body","value":"...","id":2}`.
//! Edits without an `id` target the selected mapping.

use serde::Deserialize;
use uast_dev_mappings::{parse_extensions, CustomMappingId, MappingField};
use uast_dev_session::{Result, SessionController};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionOp {
    SetLanguage {
        value: String,
    },
    SetCode {
        value: String,
    },
    SetQuery {
        value: String,
    },
    SelectEmbedded,
    SelectCustom {
        id: CustomMappingId,
    },
    ClearSelection,
    EditName {
        value: String,
        #[serde(default)]
        id: Option<CustomMappingId>,
    },
    /// Comma-separated, e.g. `".go, .gotmpl"`.
    EditExtensions {
        value: String,
        #[serde(default)]
        id: Option<CustomMappingId>,
    },
    EditBody {
        value: String,
        #[serde(default)]
        id: Option<CustomMappingId>,
    },
    ResetEmbedded,
    CreateCustom {
        #[serde(default = "default_select")]
        select: bool,
    },
    RemoveCustom {
        id: CustomMappingId,
    },
    RetryParse,
    RetryQuery,
    /// Prints the current state without changing anything.
    Snapshot,
}

const fn default_select() -> bool {
    true
}

impl SessionOp {
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    pub async fn apply(self, controller: &SessionController) -> Result<()> {
        match self {
            Self::SetLanguage { value } => controller.set_language(value),
            Self::SetCode { value } => controller.set_code(value),
            Self::SetQuery { value } => controller.set_query(value),
            Self::SelectEmbedded => controller.select_embedded(),
            Self::SelectCustom { id } => controller.select_custom(id),
            Self::ClearSelection => controller.clear_selection(),
            Self::EditName { value, id } => edit(controller, id, MappingField::Name(value)),
            Self::EditExtensions { value, id } => edit(
                controller,
                id,
                MappingField::Extensions(parse_extensions(&value)),
            ),
            Self::EditBody { value, id } => edit(controller, id, MappingField::Body(value)),
            Self::ResetEmbedded => controller.reset_embedded(),
            Self::CreateCustom { select } => controller.create_custom(select).await.map(drop),
            Self::RemoveCustom { id } => controller.remove_custom(id),
            Self::RetryParse => controller.retry_parse(),
            Self::RetryQuery => controller.retry_query(),
            Self::Snapshot => Ok(()),
        }
    }
}

fn edit(
    controller: &SessionController,
    id: Option<CustomMappingId>,
    field: MappingField,
) -> Result<()> {
    match id {
        Some(id) => controller.update_custom(id, field),
        None => controller.edit_selected(field),
    }
}
