use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use maintops_core::{Aggregate, AggregateRoot, DomainError, SiteId};
use maintops_events::{Event, Severity};

/// An operations site (plant, yard, depot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub region: String,
    #[serde(skip)]
    created: bool,
}

/// Site attributes as submitted by clients (create and full update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDraft {
    pub name: String,
    pub region: String,
}

impl Site {
    /// Not-yet-created instance; the first command must be `Create`.
    pub fn empty(id: SiteId) -> Self {
        Self {
            id,
            name: String::new(),
            region: String::new(),
            created: false,
        }
    }

    /// Rehydrate a stored site.
    pub fn restore(id: SiteId, name: String, region: String) -> Self {
        Self {
            id,
            name,
            region,
            created: true,
        }
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Site {
    type Id = SiteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteCommand {
    Create {
        draft: SiteDraft,
        occurred_at: DateTime<Utc>,
    },
    Update {
        draft: SiteDraft,
        occurred_at: DateTime<Utc>,
    },
    Delete {
        occurred_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteEvent {
    Created {
        site_id: SiteId,
        name: String,
        region: String,
        occurred_at: DateTime<Utc>,
    },
    Updated {
        site_id: SiteId,
        name: String,
        region: String,
        occurred_at: DateTime<Utc>,
    },
    Deleted {
        site_id: SiteId,
        occurred_at: DateTime<Utc>,
    },
}

impl SiteEvent {
    pub fn site_id(&self) -> SiteId {
        match self {
            SiteEvent::Created { site_id, .. }
            | SiteEvent::Updated { site_id, .. }
            | SiteEvent::Deleted { site_id, .. } => *site_id,
        }
    }
}

impl Event for SiteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SiteEvent::Created { .. } => "site_created",
            SiteEvent::Updated { .. } => "site_updated",
            SiteEvent::Deleted { .. } => "site_deleted",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            SiteEvent::Created { .. } => Severity::Success,
            SiteEvent::Updated { .. } => Severity::Info,
            SiteEvent::Deleted { .. } => Severity::Danger,
        }
    }

    fn describe(&self) -> String {
        match self {
            SiteEvent::Created { name, .. } => format!("Site {name} added"),
            SiteEvent::Updated { site_id, .. } => format!("Site #{site_id} updated"),
            SiteEvent::Deleted { site_id, .. } => format!("Site #{site_id} deleted"),
        }
    }

    fn metadata(&self) -> Option<JsonValue> {
        Some(json!({ "site_id": self.site_id().to_string() }))
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SiteEvent::Created { occurred_at, .. }
            | SiteEvent::Updated { occurred_at, .. }
            | SiteEvent::Deleted { occurred_at, .. } => *occurred_at,
        }
    }
}

fn validate(draft: &SiteDraft) -> Result<(), DomainError> {
    if draft.name.trim().is_empty() {
        return Err(DomainError::validation("site name must not be empty"));
    }
    Ok(())
}

impl Aggregate for Site {
    type Command = SiteCommand;
    type Event = SiteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SiteEvent::Created { name, region, .. } | SiteEvent::Updated { name, region, .. } => {
                self.name = name.clone();
                self.region = region.clone();
                self.created = true;
            }
            SiteEvent::Deleted { .. } => {
                self.created = false;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error> {
        match command {
            SiteCommand::Create { draft, occurred_at } => {
                if self.created {
                    return Err(DomainError::conflict("site already exists"));
                }
                validate(draft)?;
                Ok(SiteEvent::Created {
                    site_id: self.id,
                    name: draft.name.trim().to_string(),
                    region: draft.region.trim().to_string(),
                    occurred_at: *occurred_at,
                })
            }
            SiteCommand::Update { draft, occurred_at } => {
                if !self.created {
                    return Err(DomainError::not_found("site"));
                }
                validate(draft)?;
                Ok(SiteEvent::Updated {
                    site_id: self.id,
                    name: draft.name.trim().to_string(),
                    region: draft.region.trim().to_string(),
                    occurred_at: *occurred_at,
                })
            }
            SiteCommand::Delete { occurred_at } => {
                if !self.created {
                    return Err(DomainError::not_found("site"));
                }
                Ok(SiteEvent::Deleted {
                    site_id: self.id,
                    occurred_at: *occurred_at,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> SiteDraft {
        SiteDraft {
            name: name.to_string(),
            region: "North".to_string(),
        }
    }

    #[test]
    fn create_then_update() {
        let mut site = Site::empty(SiteId::new());
        let ev = site
            .execute(&SiteCommand::Create {
                draft: draft(" Plant A "),
                occurred_at: Utc::now(),
            })
            .unwrap();
        assert_eq!(ev.event_type(), "site_created");
        assert_eq!(ev.severity(), Severity::Success);
        assert_eq!(site.name, "Plant A");

        site.execute(&SiteCommand::Update {
            draft: draft("Plant A2"),
            occurred_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(site.name, "Plant A2");
    }

    #[test]
    fn update_of_unknown_site_is_not_found() {
        let site = Site::empty(SiteId::new());
        let err = site
            .handle(&SiteCommand::Update {
                draft: draft("X"),
                occurred_at: Utc::now(),
            })
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound("site"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let site = Site::empty(SiteId::new());
        assert!(matches!(
            site.handle(&SiteCommand::Create {
                draft: draft("  "),
                occurred_at: Utc::now(),
            }),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn delete_event_references_the_site() {
        let id = SiteId::new();
        let site = Site::restore(id, "Depot".into(), "South".into());
        let ev = site
            .handle(&SiteCommand::Delete {
                occurred_at: Utc::now(),
            })
            .unwrap();
        assert_eq!(ev.severity(), Severity::Danger);
        assert_eq!(ev.metadata(), Some(json!({ "site_id": id.to_string() })));
    }
}
