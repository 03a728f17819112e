use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use maintops_core::{Aggregate, AggregateRoot, DomainError, MaterialId};
use maintops_events::{Event, Severity};

/// A material definition (spare part, consumable). `unit` is an opaque label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub unit: String,
    pub description: Option<String>,
    pub reject_percent: f64,
    #[serde(skip)]
    created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDraft {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reject_percent: f64,
}

impl Material {
    pub fn empty(id: MaterialId) -> Self {
        Self {
            id,
            name: String::new(),
            unit: String::new(),
            description: None,
            reject_percent: 0.0,
            created: false,
        }
    }

    pub fn restore(id: MaterialId, draft: MaterialDraft) -> Self {
        Self {
            id,
            name: draft.name,
            unit: draft.unit,
            description: draft.description,
            reject_percent: draft.reject_percent,
            created: true,
        }
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Material {
    type Id = MaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialCommand {
    Create {
        draft: MaterialDraft,
        occurred_at: DateTime<Utc>,
    },
    Update {
        draft: MaterialDraft,
        occurred_at: DateTime<Utc>,
    },
    Delete {
        occurred_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialEvent {
    Created {
        material_id: MaterialId,
        draft: MaterialDraft,
        occurred_at: DateTime<Utc>,
    },
    Updated {
        material_id: MaterialId,
        draft: MaterialDraft,
        occurred_at: DateTime<Utc>,
    },
    Deleted {
        material_id: MaterialId,
        occurred_at: DateTime<Utc>,
    },
}

impl MaterialEvent {
    pub fn material_id(&self) -> MaterialId {
        match self {
            MaterialEvent::Created { material_id, .. }
            | MaterialEvent::Updated { material_id, .. }
            | MaterialEvent::Deleted { material_id, .. } => *material_id,
        }
    }
}

impl Event for MaterialEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MaterialEvent::Created { .. } => "material_created",
            MaterialEvent::Updated { .. } => "material_updated",
            MaterialEvent::Deleted { .. } => "material_deleted",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            MaterialEvent::Created { .. } => Severity::Success,
            MaterialEvent::Updated { .. } => Severity::Info,
            MaterialEvent::Deleted { .. } => Severity::Danger,
        }
    }

    fn describe(&self) -> String {
        match self {
            MaterialEvent::Created { draft, .. } => format!("Material {} added", draft.name),
            MaterialEvent::Updated { material_id, .. } => {
                format!("Material #{material_id} updated")
            }
            MaterialEvent::Deleted { material_id, .. } => {
                format!("Material #{material_id} deleted")
            }
        }
    }

    fn metadata(&self) -> Option<JsonValue> {
        Some(json!({ "material_id": self.material_id().to_string() }))
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MaterialEvent::Created { occurred_at, .. }
            | MaterialEvent::Updated { occurred_at, .. }
            | MaterialEvent::Deleted { occurred_at, .. } => *occurred_at,
        }
    }
}

fn normalized(draft: &MaterialDraft) -> Result<MaterialDraft, DomainError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("material name must not be empty"));
    }
    if !draft.reject_percent.is_finite() || !(0.0..=100.0).contains(&draft.reject_percent) {
        return Err(DomainError::validation(
            "reject_percent must be between 0 and 100",
        ));
    }
    Ok(MaterialDraft {
        name: name.to_string(),
        unit: draft.unit.trim().to_string(),
        description: draft.description.clone(),
        reject_percent: draft.reject_percent,
    })
}

impl Aggregate for Material {
    type Command = MaterialCommand;
    type Event = MaterialEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MaterialEvent::Created { draft, .. } | MaterialEvent::Updated { draft, .. } => {
                self.name = draft.name.clone();
                self.unit = draft.unit.clone();
                self.description = draft.description.clone();
                self.reject_percent = draft.reject_percent;
                self.created = true;
            }
            MaterialEvent::Deleted { .. } => {
                self.created = false;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error> {
        match command {
            MaterialCommand::Create { draft, occurred_at } => {
                if self.created {
                    return Err(DomainError::conflict("material already exists"));
                }
                Ok(MaterialEvent::Created {
                    material_id: self.id,
                    draft: normalized(draft)?,
                    occurred_at: *occurred_at,
                })
            }
            MaterialCommand::Update { draft, occurred_at } => {
                if !self.created {
                    return Err(DomainError::not_found("material"));
                }
                Ok(MaterialEvent::Updated {
                    material_id: self.id,
                    draft: normalized(draft)?,
                    occurred_at: *occurred_at,
                })
            }
            MaterialCommand::Delete { occurred_at } => {
                if !self.created {
                    return Err(DomainError::not_found("material"));
                }
                Ok(MaterialEvent::Deleted {
                    material_id: self.id,
                    occurred_at: *occurred_at,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bearing() -> MaterialDraft {
        MaterialDraft {
            name: "Bearing 6206".into(),
            unit: "pcs".into(),
            description: None,
            reject_percent: 0.5,
        }
    }

    #[test]
    fn create_sets_all_fields() {
        let mut m = Material::empty(MaterialId::new());
        let ev = m
            .execute(&MaterialCommand::Create {
                draft: bearing(),
                occurred_at: Utc::now(),
            })
            .unwrap();
        assert_eq!(ev.event_type(), "material_created");
        assert!(m.exists());
        assert_eq!(m.unit, "pcs");
        assert_eq!(m.reject_percent, 0.5);
    }

    #[test]
    fn reject_percent_out_of_range_is_invalid() {
        let m = Material::empty(MaterialId::new());
        let mut draft = bearing();
        draft.reject_percent = 140.0;
        assert!(matches!(
            m.handle(&MaterialCommand::Create {
                draft,
                occurred_at: Utc::now()
            }),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn update_missing_material_is_not_found() {
        let m = Material::empty(MaterialId::new());
        assert_eq!(
            m.handle(&MaterialCommand::Update {
                draft: bearing(),
                occurred_at: Utc::now()
            }),
            Err(DomainError::NotFound("material"))
        );
    }
}
