use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use maintops_core::{Aggregate, AggregateRoot, DomainError, MaterialId, SiteId};
use maintops_events::{Event, Severity};

/// Composite key of a stock record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub site_id: SiteId,
    pub material_id: MaterialId,
}

impl StockKey {
    pub fn new(site_id: SiteId, material_id: MaterialId) -> Self {
        Self {
            site_id,
            material_id,
        }
    }
}

/// Aggregate root: quantity on hand and reorder point of one material at one site.
///
/// Records are created lazily on first mutation with both values at 0 and are never
/// deleted by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    #[serde(flatten)]
    pub key: StockKey,
    pub qty_on_hand: f64,
    pub reorder_point: f64,
}

impl StockLevel {
    /// Zeroed record for a pair that has never been touched.
    pub fn empty(key: StockKey) -> Self {
        Self::restore(key, 0.0, 0.0)
    }

    pub fn restore(key: StockKey, qty_on_hand: f64, reorder_point: f64) -> Self {
        Self {
            key,
            qty_on_hand,
            reorder_point,
        }
    }

    pub fn site_id(&self) -> SiteId {
        self.key.site_id
    }

    pub fn material_id(&self) -> MaterialId {
        self.key.material_id
    }

    /// Below the reorder point. Used by reporting only.
    pub fn is_low(&self) -> bool {
        self.qty_on_hand < self.reorder_point
    }
}

impl AggregateRoot for StockLevel {
    type Id = StockKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

/// Outcome of a reserve or consume.
///
/// Stock is clamped at zero: when more is requested than is on hand, the whole on-hand
/// quantity is deducted and the remainder is reported as `shortfall`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub requested: f64,
    pub deducted: f64,
    pub shortfall: f64,
    pub qty_on_hand: f64,
    pub clamped: bool,
}

impl Withdrawal {
    pub fn compute(on_hand: f64, requested: f64) -> Self {
        Self {
            requested,
            deducted: requested.min(on_hand),
            shortfall: (requested - on_hand).max(0.0),
            qty_on_hand: (on_hand - requested).max(0.0),
            clamped: requested > on_hand,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StockCommand {
    Reserve {
        qty: f64,
        occurred_at: DateTime<Utc>,
    },
    Consume {
        qty: f64,
        occurred_at: DateTime<Utc>,
    },
    Add {
        qty: f64,
        occurred_at: DateTime<Utc>,
    },
    SetLevels {
        qty_on_hand: f64,
        reorder_point: f64,
        occurred_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StockEvent {
    Reserved {
        key: StockKey,
        withdrawal: Withdrawal,
        occurred_at: DateTime<Utc>,
    },
    Consumed {
        key: StockKey,
        withdrawal: Withdrawal,
        occurred_at: DateTime<Utc>,
    },
    Added {
        key: StockKey,
        qty: f64,
        qty_on_hand: f64,
        occurred_at: DateTime<Utc>,
    },
    LevelsSet {
        key: StockKey,
        qty_on_hand: f64,
        reorder_point: f64,
        occurred_at: DateTime<Utc>,
    },
}

impl StockEvent {
    pub fn key(&self) -> StockKey {
        match self {
            StockEvent::Reserved { key, .. }
            | StockEvent::Consumed { key, .. }
            | StockEvent::Added { key, .. }
            | StockEvent::LevelsSet { key, .. } => *key,
        }
    }

    pub fn withdrawal(&self) -> Option<Withdrawal> {
        match self {
            StockEvent::Reserved { withdrawal, .. } | StockEvent::Consumed { withdrawal, .. } => {
                Some(*withdrawal)
            }
            _ => None,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::Reserved { .. } => "inventory_reserve",
            StockEvent::Consumed { .. } => "inventory_consume",
            StockEvent::Added { .. } => "inventory_add",
            StockEvent::LevelsSet { .. } => "inventory_updated",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            StockEvent::Reserved { .. } | StockEvent::LevelsSet { .. } => Severity::Info,
            StockEvent::Consumed { .. } => Severity::Warning,
            StockEvent::Added { .. } => Severity::Success,
        }
    }

    fn describe(&self) -> String {
        match self {
            StockEvent::Reserved { withdrawal, .. } => {
                format!("Materials reserved: {}", withdrawal.requested)
            }
            StockEvent::Consumed { withdrawal, .. } => {
                format!("Materials consumed: {}", withdrawal.requested)
            }
            StockEvent::Added { qty, .. } => format!("Materials added: {qty}"),
            StockEvent::LevelsSet { key, .. } => format!(
                "Stock of material #{} at site #{} updated",
                key.material_id, key.site_id
            ),
        }
    }

    fn metadata(&self) -> Option<JsonValue> {
        let key = self.key();
        let mut meta = json!({
            "site_id": key.site_id.to_string(),
            "material_id": key.material_id.to_string(),
        });
        let extra = match self {
            StockEvent::Reserved { withdrawal, .. } | StockEvent::Consumed { withdrawal, .. } => {
                json!({
                    "qty": withdrawal.requested,
                    "deducted": withdrawal.deducted,
                    "shortfall": withdrawal.shortfall,
                })
            }
            StockEvent::Added { qty, .. } => json!({ "qty": qty }),
            StockEvent::LevelsSet {
                qty_on_hand,
                reorder_point,
                ..
            } => json!({ "qty_on_hand": qty_on_hand, "reorder_point": reorder_point }),
        };
        if let (Some(base), JsonValue::Object(extra)) = (meta.as_object_mut(), extra) {
            base.extend(extra);
        }
        Some(meta)
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::Reserved { occurred_at, .. }
            | StockEvent::Consumed { occurred_at, .. }
            | StockEvent::Added { occurred_at, .. }
            | StockEvent::LevelsSet { occurred_at, .. } => *occurred_at,
        }
    }
}

fn ensure_quantity(field: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::validation(format!(
            "{field} must be a finite, non-negative number"
        )));
    }
    Ok(())
}

impl Aggregate for StockLevel {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::Reserved { withdrawal, .. } | StockEvent::Consumed { withdrawal, .. } => {
                self.qty_on_hand = withdrawal.qty_on_hand;
            }
            StockEvent::Added { qty_on_hand, .. } => {
                self.qty_on_hand = *qty_on_hand;
            }
            StockEvent::LevelsSet {
                qty_on_hand,
                reorder_point,
                ..
            } => {
                self.qty_on_hand = *qty_on_hand;
                self.reorder_point = *reorder_point;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error> {
        let key = self.key;
        match command {
            StockCommand::Reserve { qty, occurred_at } => {
                ensure_quantity("qty", *qty)?;
                Ok(StockEvent::Reserved {
                    key,
                    withdrawal: Withdrawal::compute(self.qty_on_hand, *qty),
                    occurred_at: *occurred_at,
                })
            }
            StockCommand::Consume { qty, occurred_at } => {
                ensure_quantity("qty", *qty)?;
                Ok(StockEvent::Consumed {
                    key,
                    withdrawal: Withdrawal::compute(self.qty_on_hand, *qty),
                    occurred_at: *occurred_at,
                })
            }
            StockCommand::Add { qty, occurred_at } => {
                ensure_quantity("qty", *qty)?;
                Ok(StockEvent::Added {
                    key,
                    qty: *qty,
                    qty_on_hand: self.qty_on_hand + qty,
                    occurred_at: *occurred_at,
                })
            }
            StockCommand::SetLevels {
                qty_on_hand,
                reorder_point,
                occurred_at,
            } => {
                ensure_quantity("qty_on_hand", *qty_on_hand)?;
                ensure_quantity("reorder_point", *reorder_point)?;
                Ok(StockEvent::LevelsSet {
                    key,
                    qty_on_hand: *qty_on_hand,
                    reorder_point: *reorder_point,
                    occurred_at: *occurred_at,
                })
            }
        }
    }
}
