//! Prediction persistence
//!
//! Storage sits behind [`PredictionRepository`]; the core only hands it
//! prediction results and alerts and gets identifiers back. The in-memory
//! implementation backs tests and the demo binary.

use crate::error::{Result, SpectralError};
use crate::model::{HealthStatus, PredictionResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

const POOR_HEALTH_SCORE: f64 = 30.0;

/// Field the prediction belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRef {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub id: i64,
    pub field_id: i64,
    pub user_id: i64,
    pub health_score: f64,
    pub ndvi_value: f64,
    pub confidence: f64,
    pub status: HealthStatus,
    pub model_type: &'static str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PoorHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAlert {
    pub field_id: i64,
    pub user_id: i64,
    pub alert_type: AlertType,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub id: i64,
    #[serde(flatten)]
    pub alert: NewAlert,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Storage collaborator for predictions and alerts
pub trait PredictionRepository: Send + Sync {
    fn store_prediction(&self, field: &FieldRef, result: &PredictionResult) -> Result<i64>;

    /// Newest first
    fn predictions_for_field(&self, field_id: i64) -> Result<Vec<PredictionRecord>>;

    fn store_alert(&self, alert: NewAlert) -> Result<i64>;

    /// Newest first
    fn alerts_for_user(&self, user_id: i64, unread_only: bool) -> Result<Vec<AlertRecord>>;

    /// Returns false when no alert has this id
    fn mark_alert_read(&self, alert_id: i64) -> Result<bool>;
}

// ============================================================================
// In-memory implementation
// ============================================================================

#[derive(Debug, Default)]
struct Store {
    predictions: HashMap<i64, PredictionRecord>,
    alerts: HashMap<i64, AlertRecord>,
    next_prediction_id: i64,
    next_alert_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    data: Arc<RwLock<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Store>> {
        self.data
            .read()
            .map_err(|e| SpectralError::Repository(format!("Lock error: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Store>> {
        self.data
            .write()
            .map_err(|e| SpectralError::Repository(format!("Lock error: {}", e)))
    }
}

impl PredictionRepository for InMemoryRepository {
    fn store_prediction(&self, field: &FieldRef, result: &PredictionResult) -> Result<i64> {
        let mut store = self.write()?;
        store.next_prediction_id += 1;
        let id = store.next_prediction_id;
        store.predictions.insert(
            id,
            PredictionRecord {
                id,
                field_id: field.id,
                user_id: field.user_id,
                health_score: result.health_score,
                ndvi_value: result.ndvi_value,
                confidence: result.confidence,
                status: result.status,
                model_type: result.model_type,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn predictions_for_field(&self, field_id: i64) -> Result<Vec<PredictionRecord>> {
        let store = self.read()?;
        let mut records: Vec<PredictionRecord> = store
            .predictions
            .values()
            .filter(|p| p.field_id == field_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }

    fn store_alert(&self, alert: NewAlert) -> Result<i64> {
        let mut store = self.write()?;
        store.next_alert_id += 1;
        let id = store.next_alert_id;
        store.alerts.insert(id, AlertRecord { id, alert, is_read: false, created_at: Utc::now() });
        Ok(id)
    }

    fn alerts_for_user(&self, user_id: i64, unread_only: bool) -> Result<Vec<AlertRecord>> {
        let store = self.read()?;
        let mut alerts: Vec<AlertRecord> = store
            .alerts
            .values()
            .filter(|a| a.alert.user_id == user_id && !(unread_only && a.is_read))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(alerts)
    }

    fn mark_alert_read(&self, alert_id: i64) -> Result<bool> {
        let mut store = self.write()?;
        Ok(match store.alerts.get_mut(&alert_id) {
            Some(alert) => {
                alert.is_read = true;
                true
            }
            None => false,
        })
    }
}

// ============================================================================
// Alerts
// ============================================================================

/// Alert raised when a prediction is Poor or scores below 30
pub fn poor_health_alert(field: &FieldRef, result: &PredictionResult) -> Option<NewAlert> {
    if result.status != HealthStatus::Poor && result.health_score >= POOR_HEALTH_SCORE {
        return None;
    }
    Some(NewAlert {
        field_id: field.id,
        user_id: field.user_id,
        alert_type: AlertType::PoorHealth,
        message: format!(
            "Field '{}' shows poor crop health (Score: {}, NDVI: {:.3}). Immediate attention required.",
            field.name, result.health_score, result.ndvi_value
        ),
        severity: Severity::High,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoredPrediction {
    pub prediction_id: i64,
    pub alert_id: Option<i64>,
}

/// Persist a prediction and raise the poor-health alert when it applies
pub fn record_prediction(
    repo: &dyn PredictionRepository,
    field: &FieldRef,
    result: &PredictionResult,
) -> Result<StoredPrediction> {
    let prediction_id = repo.store_prediction(field, result)?;
    let alert_id = match poor_health_alert(field, result) {
        Some(alert) => {
            let id = repo.store_alert(alert)?;
            info!("Created poor health alert for field {}", field.id);
            Some(id)
        }
        None => None,
    };
    Ok(StoredPrediction { prediction_id, alert_id })
}
