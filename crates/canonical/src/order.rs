//! Laboratory orders and results exchanged over HL7 v2.

use crate::common::{ClinicalCode, Person, Provider};
use crate::encounter::EncounterClass;
use crate::observation::PartialObservation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    Stat,
    Asap,
    #[default]
    Routine,
}

/// An outbound laboratory order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabOrder {
    /// Placer order number.
    pub id: String,
    /// Medical record number.
    pub patient_id: String,
    pub patient: Person,
    pub encounter_class: Option<EncounterClass>,
    pub ordering_provider: Provider,
    #[serde(default)]
    pub tests: Vec<ClinicalCode>,
    #[serde(default)]
    pub priority: OrderPriority,
    pub requested_at: Option<DateTime<Utc>>,
}

/// Results reported against one order (OBR group).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResultGroup {
    pub placer_order_id: Option<String>,
    pub filler_order_id: Option<String>,
    pub service: Option<ClinicalCode>,
    pub observed_at: Option<DateTime<Utc>>,
    pub observations: Vec<PartialObservation>,
}

/// An inbound laboratory result message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabResult {
    pub message_control_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub patient_id: Option<String>,
    pub patient: Option<Person>,
    pub groups: Vec<ResultGroup>,
}

impl LabResult {
    pub fn observations(&self) -> impl Iterator<Item = &PartialObservation> {
        self.groups.iter().flat_map(|group| group.observations.iter())
    }
}
