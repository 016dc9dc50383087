//! Axum route handlers for the Communications API.

use axum::{extract::State, Json};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::communications::coordinator::{generate, CommunicationsResponse};
use crate::errors::AppError;
use crate::models::disruption::DisruptionRecord;
use crate::state::AppState;

/// POST /api/generate-communications
///
/// Generates passenger email, SMS, gate-agent talking points and a social
/// media reply for one disruption. All four succeed or the request fails.
pub async fn handle_generate_communications(
    State(state): State<AppState>,
    Json(record): Json<DisruptionRecord>,
) -> Result<Json<CommunicationsResponse>, AppError> {
    record.validate()?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "generate_communications",
        %request_id,
        flight = %record.flight_number,
        disruption = %record.disruption_type
    );

    async move {
        info!("Generating communications");
        let result = generate(&state.engine, &record).await?;
        Ok::<_, AppError>(Json(result.into_response()))
    }
    .instrument(span)
    .await
}
