use crate::models::audit::AuditEvent;
use crate::models::work_item::{EntityId, EntityKind, StepChange};
use crate::workflow::store::AuditSink;

/// Record an audit event. Audit is best-effort: a failing sink is logged and
/// never fails the operation that produced the event.
pub async fn log(sink: &dyn AuditSink, event: AuditEvent) {
    if let Err(e) = sink.record(&event).await {
        log::warn!(
            "Audit write failed for {} {} ({}): {}",
            event.target_type,
            event.target_id,
            event.action,
            e
        );
    }
}

pub fn step_changed<Id: EntityId>(kind: EntityKind, change: &StepChange<Id>) -> AuditEvent {
    AuditEvent {
        actor: change.actor.clone(),
        action: format!("{}.step_changed", kind.as_str()),
        target_type: kind.as_str().to_string(),
        target_id: change.id.to_string(),
        details: serde_json::json!({
            "from_step_id": change.from_step_id,
            "to_step_id": change.to_step_id,
            "reason": change.reason,
            "summary": format!(
                "Moved {} {} from step {} to step {}",
                kind.as_str(),
                change.id,
                change.from_step_id,
                change.to_step_id
            ),
        }),
    }
}
